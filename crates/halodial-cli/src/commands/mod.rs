use anyhow::Result;
use halodial_config::AppConfig;
use serde::Serialize;
use std::io::{self, Write};

pub mod completions;
pub mod normalize;
pub mod run;

pub struct Context<'a> {
    pub json: bool,
    pub config: &'a AppConfig,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
