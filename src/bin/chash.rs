// MIT License
//
// Copyright (c) 2020 Gregory Meyer
//
// Permission is hereby granted, free of charge, to any person
// obtaining a copy of this software and associated documentation files
// (the "Software"), to deal in the Software without restriction,
// including without limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of the Software,
// and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS
// BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN
// ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use std::{
    env,
    fs::{self, File},
    io::BufWriter,
    process::ExitCode,
};

use chash::{Config, Dispatcher, OperationLog, Result, Script};

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("chash: {}", e);

            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let commands_path = args.next().unwrap_or_else(|| "commands.txt".to_string());
    let output_path = args.next().unwrap_or_else(|| "output.txt".to_string());

    let script: Script = fs::read_to_string(&commands_path)?.parse()?;
    let output = BufWriter::new(File::create(&output_path)?);

    let dispatcher = Dispatcher::with_log(Config::default(), OperationLog::to_writer(output)?)?;
    let report = dispatcher.run_all(&script.commands);

    dispatcher.log().flush()?;

    let failed = report.outcomes.iter().filter(|outcome| outcome.is_failed()).count();

    log::info!(
        "ran {} commands from {} ({} failed), {} entries written to {}",
        report.outcomes.len(),
        commands_path,
        failed,
        report.snapshot.len(),
        output_path
    );

    Ok(())
}
