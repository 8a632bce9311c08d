fn main() {
    let args = std::env::args();

    if let Err(err) = pginc::run(args) {
        eprintln!("pginc error: {err}");
        std::process::exit(1);
    }
}
