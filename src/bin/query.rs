use clap::{Parser, Subcommand};
use glove_trainer::{files_handling::ReadFile, Embeddings, Similarity};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};


// checks on trained vectors:
// the K most similar words to a given word,
// the K most similar words to a combination of words (analogies).
// treated as binary executable so it can be ran independently from training

#[derive(Parser)]
#[command(name = "glove-query")]
#[command(about = "Nearest neighbour and analogy queries over trained vectors")]
struct Cli {
    /// Trained vectors in the text layout (vectors.txt)
    vectors: PathBuf,

    /// Number of results per query
    #[arg(short, default_value_t = 10)]
    k: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Input file with one token per line
    Similar { input: PathBuf },
    /// Input file with four tokens per line, "a b c d" reads a is to b as c is to d
    Analogy { input: PathBuf },
}

fn main() -> Result<(), Box<dyn Error>> {

    let cli = Cli::parse();
    let embeddings = Embeddings::read_file(&cli.vectors)?;
    let similarity_object = Similarity::new(embeddings);

    match cli.command {
        Commands::Similar { input } => {
            let inputs = read_lines(&input)?
                .into_iter()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect::<Vec<String>>();
            run_similarity(&inputs, cli.k, &similarity_object)
        },
        Commands::Analogy { input } => {
            let inputs = read_lines(&input)?
                .iter()
                .map(|line| line.split_whitespace().map(|x| x.to_string()).collect::<Vec<String>>())
                .filter(|quad| !quad.is_empty())
                .collect::<Vec<Vec<String>>>();
            run_analogies(&inputs, cli.k, &similarity_object)
        },
    }
}

fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    io::BufReader::new(File::open(path)?).lines().collect()
}

fn run_analogies(inputs: &[Vec<String>], k: usize, similarity_object: &Similarity) -> Result<(), Box<dyn Error>> {

    // a is to b as like c is to ?
    // translates to b - a + c : ?
    for input in inputs {

        if input.len() != 4 {
            return Err(format!("expected four tokens per analogy line, found {:?}", input).into());
        }

        let source = [input[0].as_str(), input[1].as_str(), input[2].as_str()];
        let target = input[3].as_str();

        let analogies = similarity_object.extract_analogies(source, k)?;
        let mut found_target = false;
        for (i, (analogy, score)) in analogies.iter().enumerate() {
            println!("{} : {} - {} + {} ? {} = {}", i, source[1], source[0], source[2], analogy, score);
            if analogy == target {
                found_target = true;
                println!("found target '{}' analogy in place {}", target, 1 + i);
            }
        }

        if !found_target {
            println!("target '{}' was not found within the first {} analogies", target, k);
        }

        println!();
    }
    Ok(())
}

fn run_similarity(inputs: &[String], k: usize, similarity_object: &Similarity) -> Result<(), Box<dyn Error>> {

    // finding the k most similar words to each of the input tokens
    for token in inputs {

        println!("searching {} most similar words to {}", k, token);
        let similarities = similarity_object.most_similar(token, k)?;
        for (i, (similar_token, score)) in similarities.iter().enumerate() {
            println!("{} : {} ? {} = {}", i, token, similar_token, score);
        }
        println!();
    }
    Ok(())
}
