use crate::commands::print_json;
use anyhow::Result;
use clap::Args;
use halodial_core::normalize_uk_phone;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    #[arg(required = true)]
    pub numbers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct NormalizedNumber {
    input: String,
    normalized: Option<String>,
}

pub fn normalize(json: bool, args: NormalizeArgs) -> Result<()> {
    let results: Vec<NormalizedNumber> = args
        .numbers
        .into_iter()
        .map(|input| {
            let normalized = normalize_uk_phone(&input);
            NormalizedNumber { input, normalized }
        })
        .collect();

    if json {
        return print_json(&results);
    }

    for result in results {
        match result.normalized {
            Some(normalized) => println!("{} -> {}", result.input, normalized),
            None => println!("{} (unchanged)", result.input),
        }
    }
    Ok(())
}
