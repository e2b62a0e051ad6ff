fn main() {
    let args: Vec<String> = std::env::args().collect();
    if let Err(err) = satchel::run(&args) {
        eprintln!("satchel: {}", err);
        std::process::exit(1);
    }
}
