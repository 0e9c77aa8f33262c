#![forbid(unsafe_code)]

//! Solna CLI: enveloped XML signatures and canonicalization.

use clap::{Parser, Subcommand};
use solna::{C14nMode, DsigContext, Error, Runtime, SignatureProfile, Verdict};
use solna_core::ns;
use solna_keys::{loader, KeysManager};
use solna_xml::{Document, NodeId};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "solna",
    about = "Solna: XML canonicalization and enveloped XML-DSig in pure Rust",
    version
)]
struct Cli {
    /// Log debug output, including pre-digest and pre-signature data
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an enveloped signature to an XML document
    Sign {
        /// Input XML file
        file: PathBuf,

        /// Private key (PEM or DER, PKCS#8 or PKCS#1)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Certificate to publish in KeyInfo/X509Data
        #[arg(long)]
        cert: Option<PathBuf>,

        /// Name to publish in KeyInfo/KeyName
        #[arg(long = "key-name")]
        key_name: Option<String>,

        /// Sign the element whose ID attribute has this value (default: the document element)
        #[arg(long = "node-id")]
        node_id: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify the first signature in an XML document
    Verify {
        /// Input XML file
        file: PathBuf,

        /// Trusted certificate or public key; may be repeated, as NAME:FILE to match KeyName
        #[arg(long, required = true)]
        cert: Vec<String>,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,
    },

    /// Canonicalize an XML document
    C14n {
        /// Input XML file
        file: PathBuf,

        /// Use Exclusive XML Canonicalization
        #[arg(long)]
        exclusive: bool,

        /// Keep comments
        #[arg(long = "with-comments")]
        with_comments: bool,

        /// InclusiveNamespaces prefix list for exclusive mode (`#default` for the default namespace)
        #[arg(long, value_delimiter = ',')]
        prefixes: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported algorithms and key types
    Info,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let _runtime = match Runtime::init() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Sign {
            file,
            key,
            cert,
            key_name,
            node_id,
            output,
        } => cmd_sign(&file, &key, cert.as_deref(), key_name, node_id, output),
        Commands::Verify {
            file,
            cert,
            id_attr,
        } => cmd_verify(&file, &cert, id_attr),
        Commands::C14n {
            file,
            exclusive,
            with_comments,
            prefixes,
            output,
        } => cmd_c14n(&file, C14nMode::new(exclusive, with_comments), &prefixes, output),
        Commands::Info => cmd_info(),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_sign(
    file: &Path,
    key_path: &Path,
    cert: Option<&Path>,
    key_name: Option<String>,
    node_id: Option<String>,
    output: Option<PathBuf>,
) -> Result<bool, Error> {
    let mut doc = read_document(file)?;
    let mut key = loader::load_key_file(key_path)?;
    if let Some(path) = cert {
        key = key.with_certificate_pem(&read_bytes(path)?)?;
    }
    if let Some(name) = key_name {
        key = key.with_name(name);
    }

    let target = match &node_id {
        Some(id) => find_by_id(&doc, id)
            .ok_or_else(|| Error::ReferenceResolution(format!("no element with ID {id:?}")))?,
        None => doc
            .document_element()
            .ok_or_else(|| Error::MissingElement("document element".into()))?,
    };
    tracing::debug!(file = %file.display(), "signing");
    solna::sign_enveloped(&mut doc, target, &key, &SignatureProfile::default())?;

    write_output(output, doc.to_xml_string()?.as_bytes())?;
    Ok(true)
}

fn cmd_verify(file: &Path, certs: &[String], id_attr: Vec<String>) -> Result<bool, Error> {
    let doc = read_document(file)?;

    let mut mgr = KeysManager::new();
    for entry in certs {
        let key = match entry.split_once(':') {
            Some((name, path)) if !name.is_empty() && Path::new(path).exists() => {
                loader::load_key_file(Path::new(path))?.with_name(name)
            }
            _ => loader::load_key_file(Path::new(entry))?,
        };
        mgr.add_key(key);
    }

    let mut ctx = DsigContext::new(mgr);
    for attr in &id_attr {
        ctx.add_id_attr(attr);
    }

    tracing::debug!(file = %file.display(), "verifying");
    let verdict = ctx.verify(&doc, doc.root())?;
    match &verdict {
        Verdict::Succeeded => println!("{verdict}"),
        _ => eprintln!("{verdict}"),
    }
    Ok(verdict.is_succeeded())
}

fn cmd_c14n(
    file: &Path,
    mode: C14nMode,
    prefixes: &[String],
    output: Option<PathBuf>,
) -> Result<bool, Error> {
    let doc = read_document(file)?;
    match output {
        Some(path) => {
            let mut sink = std::fs::File::create(path)?;
            solna::canonicalize_to(&doc, None, mode, prefixes, &mut sink)?;
        }
        None => {
            let mut sink = std::io::stdout().lock();
            solna::canonicalize_to(&doc, None, mode, prefixes, &mut sink)?;
            sink.flush()?;
        }
    }
    Ok(true)
}

fn cmd_info() -> Result<bool, Error> {
    println!("Solna: XML canonicalization and XML digital signatures");
    println!();
    println!("Supported canonicalization:");
    for mode in [
        C14nMode::Inclusive,
        C14nMode::InclusiveWithComments,
        C14nMode::Exclusive,
        C14nMode::ExclusiveWithComments,
    ] {
        println!("  {mode}");
    }
    println!();
    println!("Supported transforms:");
    println!("  {}", solna_core::algorithm::ENVELOPED_SIGNATURE);
    println!();
    println!("Supported digest algorithms:");
    println!("  SHA-1, SHA-256, SHA-384, SHA-512");
    println!();
    println!("Supported signature algorithms:");
    println!("  RSA PKCS#1 v1.5 (SHA-1, SHA-256, SHA-384, SHA-512)");
    println!();
    println!("Supported key formats:");
    println!("  PEM, DER (RSA PKCS#8, PKCS#1, SubjectPublicKeyInfo, X.509 certificates)");
    Ok(true)
}

// ── Utility functions ────────────────────────────────────────────────

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path)
        .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))))
}

fn read_document(path: &Path) -> Result<Document, Error> {
    Document::parse_bytes(&read_bytes(path)?)
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => Ok(std::fs::write(p, data)?),
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(data)?;
            Ok(out.flush()?)
        }
    }
}

fn find_by_id(doc: &Document, id: &str) -> Option<NodeId> {
    doc.descendants(doc.root())
        .find(|&n| doc.attribute(n, ns::attr::ID) == Some(id))
}
