pub fn cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let secure_attr = if secure { "; Secure" } else { "" };
    format!("{name}={value}; HttpOnly; Max-Age={max_age}; Path=/; SameSite=Strict{secure_attr}")
}
