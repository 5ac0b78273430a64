use std::{
    fs,
    io::{self, BufReader, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use railfence_cli::{
    breach::{AuditStatus, BreachChecker, BreachConfig, HttpRangeSource, DEFAULT_ENDPOINT},
    logging,
    signing::{self, SigningError},
};

#[derive(Parser)]
#[command(name = "railfence", version, about = "Rail fence cipher and companion security tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Zigzag-encode text (by codepoint) or a file (by byte).
    Encode(CipherArgs),
    /// Invert `encode` with the same key.
    Decode(CipherArgs),
    /// Generate an Ed25519 keypair as sk.hex / pk.hex.
    Keygen {
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Write a detached signature to <file>.sig.
    Sign {
        file: PathBuf,
        #[arg(long)]
        sk: PathBuf,
    },
    /// Check a detached signature. Exits with 2 when it does not verify.
    Verify {
        file: PathBuf,
        #[arg(long)]
        pk: PathBuf,
        #[arg(long)]
        sig: Option<PathBuf>,
    },
    /// Count how often a password appears in known breaches.
    Pwned {
        secret: String,
        #[command(flatten)]
        lookup: LookupArgs,
    },
    /// Check a `username,password` file. Exits with 2 if any password is exposed.
    Audit {
        file: PathBuf,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        lookup: LookupArgs,
    },
}

#[derive(Args)]
struct CipherArgs {
    /// Number of rails.
    #[arg(long, allow_negative_numbers = true)]
    key: i64,
    /// Text to transform; read from stdin when neither TEXT nor --input is given.
    #[arg(conflicts_with = "input")]
    text: Option<String>,
    /// Transform the raw bytes of this file instead of text.
    #[arg(long, requires = "output")]
    input: Option<PathBuf>,
    #[arg(long, requires = "input")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct LookupArgs {
    #[arg(long, env = "RAILFENCE_RANGE_URL", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    #[arg(long, env = "RAILFENCE_TIMEOUT_MS", default_value_t = 10_000)]
    timeout_ms: u64,
}

impl LookupArgs {
    fn checker(&self) -> Result<BreachChecker<HttpRangeSource>> {
        let config = BreachConfig {
            endpoint: self.endpoint.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            ..BreachConfig::default()
        };
        let source = HttpRangeSource::new(&config).context("building range client")?;
        Ok(BreachChecker::new(source))
    }
}

//==================== I/O helpers ====================//

fn read_all(p: &Path) -> Result<Vec<u8>> {
    fs::read(p).with_context(|| format!("reading {}", p.display()))
}

fn write_all(p: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(p, bytes).with_context(|| format!("writing {}", p.display()))
}

//==================== encode / decode ====================//

#[derive(Clone, Copy, Debug)]
enum Direction {
    Encode,
    Decode,
}

impl Direction {
    fn past_tense(self) -> &'static str {
        match self {
            Direction::Encode => "Encoded",
            Direction::Decode => "Decoded",
        }
    }
}

fn cipher_cmd(args: CipherArgs, direction: Direction) -> Result<ExitCode> {
    if let (Some(input), Some(output)) = (&args.input, &args.output) {
        let data = read_all(input)?;
        let out = match direction {
            Direction::Encode => railfence_core::encode(&data, args.key)?,
            Direction::Decode => railfence_core::decode(&data, args.key)?,
        };
        write_all(output, &out)?;
        tracing::info!(?direction, key = args.key, bytes = out.len(), "file transformed");
        println!("{} → {}", direction.past_tense(), output.display());
        return Ok(ExitCode::SUCCESS);
    }

    match args.text {
        Some(text) => println!("{}", transform_text(&text, args.key, direction)?),
        None => text_stream(io::stdin().lock(), io::stdout().lock(), args.key, direction)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn transform_text(text: &str, key: i64, direction: Direction) -> Result<String> {
    Ok(match direction {
        Direction::Encode => railfence_core::encode_str(text, key)?,
        Direction::Decode => railfence_core::decode_str(text, key)?,
    })
}

/// Line-oriented text mode: one trailing `\n` on input is taken as the line
/// terminator and exactly one is written back, so `encode | decode` pipes
/// preserve every other symbol, newlines included.
fn text_stream<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    key: i64,
    direction: Direction,
) -> Result<()> {
    let mut raw = String::new();
    input.read_to_string(&mut raw).context("reading stdin")?;
    let text = raw.strip_suffix('\n').unwrap_or(&raw);
    let out = transform_text(text, key, direction)?;
    writeln!(output, "{out}").context("writing stdout")?;
    output.flush().context("writing stdout")?;
    Ok(())
}

//==================== keys and signatures ====================//

fn keygen_cmd(out_dir: &Path) -> Result<ExitCode> {
    let sk = signing::write_keypair(out_dir)
        .with_context(|| format!("writing keypair to {}", out_dir.display()))?;
    println!(
        "keypair written → {} (fingerprint {})",
        out_dir.display(),
        signing::fingerprint(&sk.verifying_key())
    );
    Ok(ExitCode::SUCCESS)
}

fn sign_cmd(file: &Path, sk_path: &Path) -> Result<ExitCode> {
    let sk = signing::load_signing_key(sk_path).context("loading secret key")?;
    let sig_path = signing::sign_file(file, &sk)?;
    println!(
        "File '{}' signed. Signature saved as '{}'.",
        file.display(),
        sig_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

/// `Ok(false)` when the signature does not verify; I/O and key errors bubble up.
fn check_signature(file: &Path, pk_path: &Path, sig: Option<PathBuf>) -> Result<bool> {
    let pk = signing::load_verifying_key(pk_path).context("loading public key")?;
    let sig_path = sig.unwrap_or_else(|| signing::signature_path(file));
    match signing::verify_file(file, &sig_path, &pk) {
        Ok(()) => {
            println!("Signature VALID for file '{}'.", file.display());
            Ok(true)
        }
        Err(err @ (SigningError::Invalid(_) | SigningError::SignatureLength(_))) => {
            println!("Signature INVALID for file '{}'. {err}", file.display());
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

fn verify_cmd(file: &Path, pk_path: &Path, sig: Option<PathBuf>) -> Result<ExitCode> {
    if check_signature(file, pk_path, sig)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

//==================== breach lookups ====================//

fn pwned_cmd(secret: &str, lookup: &LookupArgs) -> Result<ExitCode> {
    let count = lookup.checker()?.check(secret)?;
    if count > 0 {
        println!("Password found {count} times in breaches!");
    } else {
        println!("Password NOT found in any known breach.");
    }
    Ok(ExitCode::SUCCESS)
}

fn audit_cmd(file: &Path, json: bool, lookup: &LookupArgs) -> Result<ExitCode> {
    let reader = fs::File::open(file)
        .map(BufReader::new)
        .with_context(|| format!("opening {}", file.display()))?;
    let entries = lookup.checker()?.audit(reader)?;

    for entry in &entries {
        if json {
            println!("{}", serde_json::to_string(entry)?);
        } else {
            println!("{}", entry.summary());
        }
    }

    let exposed = entries
        .iter()
        .filter(|e| e.status == AuditStatus::Exposed)
        .count();
    tracing::info!(checked = entries.len(), exposed, "audit complete");
    if exposed > 0 {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

//==================== main ====================//

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Encode(args) => cipher_cmd(args, Direction::Encode),
        Command::Decode(args) => cipher_cmd(args, Direction::Decode),
        Command::Keygen { out_dir } => keygen_cmd(&out_dir),
        Command::Sign { file, sk } => sign_cmd(&file, &sk),
        Command::Verify { file, pk, sig } => verify_cmd(&file, &pk, sig),
        Command::Pwned { secret, lookup } => pwned_cmd(&secret, &lookup),
        Command::Audit { file, json, lookup } => audit_cmd(&file, json, &lookup),
    }
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
