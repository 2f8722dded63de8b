//! Command-line embedder: load a GGUF model, embed a prompt, print the vector.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use bert_embed::{BertEmbedder, EmbedResult, LoadConfig};

#[derive(Parser)]
#[command(name = "bert-embed", version, about = "Sentence embeddings from GGUF BERT models")]
struct Args {
    /// Path to the GGUF model file
    #[arg(short, long)]
    model: PathBuf,

    /// Text to embed
    #[arg(short, long, default_value = "Hello world!")]
    prompt: String,

    /// Worker threads for CPU compute (default: runtime choice)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Emit JSON instead of plain text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    n_embd: usize,
    prompt: &'a str,
    embedding: &'a [f32],
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> EmbedResult<()> {
    let config = LoadConfig {
        threads: args.threads,
        ..LoadConfig::default()
    };
    let embedder = BertEmbedder::load_with(&args.model, config)?;
    let embedding = embedder.encode(&args.prompt)?;

    if args.json {
        let output = JsonOutput {
            n_embd: embedder.n_embd(),
            prompt: &args.prompt,
            embedding: &embedding,
        };
        println!(
            "{}",
            serde_json::to_string(&output).expect("embedding output serializes")
        );
    } else {
        println!("n_embd = {}", embedder.n_embd());
        print!("[");
        for (i, v) in embedding.iter().enumerate() {
            if i > 0 {
                print!(", ");
            }
            print!("{v:.6}");
        }
        println!("]");
    }
    Ok(())
}
