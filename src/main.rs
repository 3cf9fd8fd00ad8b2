mod cli;
mod commands;
mod config;
mod logging;
mod playbook;
mod scan;
mod storage;

use commands::{CommandResult, Context};
use config::JobLogConfig;
use storage::JobStore;
use tracing::{debug, info};

fn main() {
    // プロセス終了前にログのガードを drop させるため、本体は run に分ける
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let cli = match commands::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(result) => return emit(&result),
    };

    cli::color::init();
    let config = JobLogConfig::load();

    // ログシステムの初期化（_guard は run 終了まで保持する必要がある）
    let _guard = config
        .data_dir()
        .ok()
        .and_then(|dir| logging::init_logging(&dir.join("logs")));
    info!(version = env!("CARGO_PKG_VERSION"), "job-log started");

    let store = match JobStore::open(&config) {
        Ok(store) => store,
        Err(e) => {
            return emit(&CommandResult::error(
                format!("{} {e:#}\n", cli::color::bold_red("job: error:")),
                commands::EXIT_FAILURE,
            ));
        }
    };
    debug!(db = %store.db_path().display(), "Database opened");

    let ctx = Context {
        store: &store,
        config: &config,
    };
    let result = commands::dispatch(&ctx, cli.command);
    debug!(exit_code = result.exit_code, "Command finished");
    emit(&result)
}

/// 結果を標準出力・標準エラー出力に書き出し、終了コードを返す。
fn emit(result: &CommandResult) -> i32 {
    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }
    result.exit_code
}
