//! Offline utility: mints a signed access token for the send endpoint and
//! prints it for manual distribution. Not served by the running process.

use slack_relay::mint_token;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| "JWT_SECRET environment variable is required")?;
    let subject = std::env::args().nth(1).unwrap_or_else(|| "backend-dev".to_string());

    let token = mint_token(secret.as_bytes(), &subject)?;
    println!("{token}");
    Ok(())
}
