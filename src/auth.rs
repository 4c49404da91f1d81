use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal, Write};
use zeroize::Zeroizing;

pub fn read_password() -> Result<Zeroizing<String>> {
    //  Environment Variable
    //  SFM_PASSWORD="supersecret" sfm open vault.sfm
    if let Ok(pw) = std::env::var("SFM_PASSWORD") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    //  stdin (Pipeline)
    //  printf "%s" "$SFM_PASSWORD" | sfm open vault.sfm
    if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        let pw = buf.trim_end().to_string();

        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    //  Interactive (TTY)
    if io::stdin().is_terminal() {
        let pw = rpassword::prompt_password("Enter Password: ")?;
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    bail!("No password provided")
}

/// Asks for explicit confirmation before destroying data. Only a line
/// starting with `y` or `Y` counts as a yes.
pub fn confirm_wipe() -> Result<bool> {
    print!("Are you sure? (y/n): ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;

    Ok(matches!(answer.trim(), "y" | "Y"))
}
