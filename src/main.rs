fn main() {
    if let Err(err) = varys::cli::main() {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
}
