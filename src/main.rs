fn main() {
    if let Err(err) = ad_insights::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
