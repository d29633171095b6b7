use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    mmchat::cli::main()
}
