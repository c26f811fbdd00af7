// crates/trustgate-cli/src/commands/keys.rs
//
// `trustgate keygen` and `trustgate address`: authority key management.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

use trustgate_core::address::Address;
use trustgate_core::crypto::Keypair;
use trustgate_core::encoding::decode_fixed;

pub const SECRET_FILE: &str = "authority.secret";
pub const PUBLIC_FILE: &str = "authority.pub";

#[derive(Debug, Args)]
pub struct KeygenCmd {
    /// Directory to write `authority.secret` and `authority.pub` into.
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct AddressCmd {
    /// Hex ed25519 public key.
    #[arg(long)]
    pub public_key: String,
}

pub fn keygen(cmd: &KeygenCmd) -> Result<(), Box<dyn std::error::Error>> {
    let secret_path = cmd.out.join(SECRET_FILE);
    if secret_path.exists() {
        return Err(format!("Refusing to overwrite {}", secret_path.display()).into());
    }

    let keypair = Keypair::generate();
    let public_path = write_keypair(&cmd.out, &keypair)?;

    println!("Authority key generated.");
    println!("  Public key: {}", hex::encode(keypair.public_key_bytes()));
    println!("  Address:    {}", keypair.address());
    println!("  Saved to:   {}", public_path.display());
    println!();
    println!("Set `authority_public_key` in the daemon config to the public key above.");
    println!("Keep {} offline.", secret_path.display());
    Ok(())
}

fn write_keypair(dir: &Path, keypair: &Keypair) -> Result<PathBuf, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(SECRET_FILE), hex::encode(keypair.signing_key.to_bytes()))?;
    let public_path = dir.join(PUBLIC_FILE);
    fs::write(&public_path, hex::encode(keypair.public_key_bytes()))?;
    Ok(public_path)
}

/// Read a hex secret written by `keygen`.
pub fn load_keypair(path: &Path) -> Result<Keypair, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    let secret = decode_fixed::<32>(contents.trim())?;
    Ok(Keypair::from_secret_bytes(&secret))
}

pub fn address(cmd: &AddressCmd) -> Result<(), Box<dyn std::error::Error>> {
    let key = decode_fixed::<32>(cmd.public_key.trim())?;
    println!("{}", Address::from_public_key(&key));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_secret_loads_back() {
        let dir = std::env::temp_dir().join(format!("trustgate_cli_{}", uuid::Uuid::now_v7()));
        let keypair = Keypair::generate();
        write_keypair(&dir, &keypair).unwrap();

        let loaded = load_keypair(&dir.join(SECRET_FILE)).unwrap();
        assert_eq!(loaded.address(), keypair.address());
        let public = fs::read_to_string(dir.join(PUBLIC_FILE)).unwrap();
        assert_eq!(public, hex::encode(keypair.public_key_bytes()));
    }
}
