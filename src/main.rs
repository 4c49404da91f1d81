use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
mod auth;
use sfm::{
    ContainerError, KdfParams, LoginOutcome, create_container_with_kdf, decrypt_file,
    encrypt_file_with_kdf, open_container, secure_delete,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, clap::Args)]
struct Argon2Args {
    /// Argon2 time cost / iterations (default: 3)
    #[arg(long = "argon-time")]
    iterations: Option<u32>,

    /// Argon2 memory cost in KiB (default: 65536)
    #[arg(long = "argon-mem")]
    memory_kib: Option<u32>,
}

impl Argon2Args {
    fn to_kdf_params(&self) -> Result<KdfParams> {
        let default = KdfParams::default();

        KdfParams::new(
            self.iterations.unwrap_or(default.iterations()),
            self.memory_kib.unwrap_or(default.memory_kib()),
        )
    }
}

#[derive(Debug, Parser)]
#[command(name = "sfm")]
#[command(
    version,
    about = "Password-protected encrypted file containers with secure deletion."
)]
struct Cli {
    /// Path to a login hash file guarding every command
    #[arg(long, global = true, value_name = "PATH", env = "SFM_LOGIN_FILE")]
    login: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Creates a new empty container
    #[command(arg_required_else_help = true)]
    Create {
        path: PathBuf,
        /// Container size in MiB
        #[arg(default_value_t = 10)]
        size_mb: u64,
        #[command(flatten)]
        argon2: Argon2Args,
    },

    /// Checks a container password
    #[command(arg_required_else_help = true)]
    Open { path: PathBuf },

    /// Encrypts a single file
    #[command(arg_required_else_help = true)]
    Enc {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        argon2: Argon2Args,
    },

    /// Decrypts a single file
    #[command(arg_required_else_help = true)]
    Dec { input: PathBuf, output: PathBuf },

    /// Securely wipes and deletes a file
    #[command(arg_required_else_help = true)]
    Del { path: PathBuf },
}

fn main() -> ExitCode {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let kind = err.kind();
            let _ = err.print();
            return match kind {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // operation failures are reported as text, not exit codes
            eprintln!("[Error] {err:#}");
            ExitCode::SUCCESS
        }
    }
}

fn run(args: Cli) -> Result<()> {
    if let Commands::Del { path } = &args.command {
        if let Some(store) = &args.login {
            let password = auth::read_password()?;
            ensure_login(store, &password)?;
        }

        println!(
            "WARNING: This will permanently destroy data in: {}",
            path.display()
        );
        if !auth::confirm_wipe()? {
            println!("Operation cancelled.");
            return Ok(());
        }

        println!("[Core] Securely wiping file: {}", path.display());
        secure_delete(path)?;
        println!("[Success] File securely wiped and deleted.");
        return Ok(());
    }

    let password = auth::read_password()?;
    if let Some(store) = &args.login {
        ensure_login(store, &password)?;
    }

    match args.command {
        Commands::Create {
            path,
            size_mb,
            argon2,
        } => {
            let kdf = argon2.to_kdf_params()?;
            let size_in_bytes = size_mb * 1024 * 1024;

            println!("[Core] Initializing secure container...");
            create_container_with_kdf(&path, &password, size_in_bytes, kdf)?;
            println!("[Success] Container created: {}", path.display());
        }
        Commands::Open { path } => {
            println!("[Core] Attempting to open container...");
            match open_container(&path, &password) {
                Ok(()) => println!("[Success] Password correct! Container is valid."),
                Err(ContainerError::Authentication) => {
                    eprintln!("[Access Denied] Incorrect password.")
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Enc {
            input,
            output,
            argon2,
        } => {
            let kdf = argon2.to_kdf_params()?;

            println!(
                "[Core] Encrypting file: {} -> {}",
                input.display(),
                output.display()
            );
            encrypt_file_with_kdf(&input, &output, &password, kdf)?;
            println!("[Success] File encrypted successfully.");
        }
        Commands::Dec { input, output } => {
            println!(
                "[Core] Decrypting file: {} -> {}",
                input.display(),
                output.display()
            );
            decrypt_file(&input, &output, &password)?;
            println!("[Success] File decrypted successfully.");
        }
        // handled before the password prompt
        Commands::Del { .. } => {}
    }

    Ok(())
}

fn ensure_login(store: &Path, password: &str) -> Result<()> {
    match sfm::authenticate_or_register(store, password)? {
        LoginOutcome::Registered => println!("[Auth] Master password initialized."),
        LoginOutcome::Accepted => println!("[Auth] Success."),
        LoginOutcome::Rejected => anyhow::bail!("login failed: incorrect password"),
    }
    Ok(())
}
