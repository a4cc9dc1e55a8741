use finance_tracker::{cli::run_command, init};

fn main() {
    init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = run_command(&args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
