/// Parse a dev server port.
///
/// Port 0 would let the OS pick a port nobody can guess, so it is rejected.
///
/// # Errors
///
/// Returns an error message if the value is not a number in 1..=65535.
pub fn parse_port(s: &str) -> Result<u16, String> {
    let port: u16 = s
        .parse()
        .map_err(|_| format!("Port must be a number between 1 and 65535: '{}'", s))?;

    if port == 0 {
        return Err("Port must be a number between 1 and 65535: '0'".to_string());
    }

    Ok(port)
}
