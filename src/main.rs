fn main() {
    if let Err(err) = pathway_extract::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
