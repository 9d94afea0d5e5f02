use anyhow::Result;
use sha2::{Digest, Sha512_256};
use std::fs;
use std::path::PathBuf;

/// Hex SHA-512/256 digest of a byte slice. The server logs this for the
/// payload it serves, so downloads can be verified with the `sum`
/// subcommand on the receiving side.
pub fn hex_digest(bytes: &[u8]) -> String {
    Sha512_256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Print one `digest  path` line per file. Unreadable files are
/// reported on stderr and the remaining files are still processed.
pub fn run(files: &[PathBuf]) -> Result<()> {
    let mut failed = false;

    for file in files {
        match fs::read(file) {
            Ok(bytes) => println!("{}  {}", hex_digest(&bytes), file.display()),
            Err(err) => {
                failed = true;
                eprintln!("{}: {}", file.display(), err);
            }
        }
    }

    if failed {
        anyhow::bail!("some files could not be read");
    }

    Ok(())
}
