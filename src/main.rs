/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;

#[derive(ClapParser)]
#[clap(version = "0.1.0", author = "Connor Nolan")]
struct Opts {
    /// Source file to compile.
    #[clap(short, long)]
    input: PathBuf,

    /// Where to write the selected assembly. Defaults to stdout.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Print the IR after control-flow cleanup, before instruction
    /// selection, instead of compiling through to assembly.
    #[clap(long)]
    dump_ir: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let source = fs::read_to_string(&opts.input).with_context(|| format!("failed to read input file: {}", opts.input.display()))?;

    if opts.dump_ir {
        let tokens = vecc::front::lexer::lex(&source)?;
        let mut procs = vecc::front::parser::parse(&tokens)?;
        let proc = procs.first_mut().context("no procedure definitions in source")?;
        vecc::cleanup::run(proc)?;
        for id in proc.iter_ids() {
            println!("{:?}", proc.get(id).kind);
        }
        return Ok(());
    }

    let lines = vecc::compile_source(&source)?;
    let rendered = lines.join("\n");

    match opts.output {
        Some(path) => {
            fs::write(&path, rendered + "\n").with_context(|| format!("failed to write output file: {}", path.display()))?;
            println!("Successfully compiled {} to {}", opts.input.display(), path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
