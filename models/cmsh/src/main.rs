use std::{
	env,
	error::Error,
	fs::File,
	io::BufReader
};

use tracing::{
	info,
	Level
};
use tracing_subscriber::FmtSubscriber;

use rgk_models_cmsh::{
	import_from_stream,
	ImportCfg
};

fn main() -> Result<(), Box<dyn Error>> {
	let log_level = env::var("RUST_LOG").ok()
		.and_then(|l| l.parse().ok())
		.unwrap_or(Level::INFO);

	let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let args: Vec<String> = env::args().collect();
	if args.len() < 2 {
		eprintln!("usage: {} <file.cmsh>", args[0]);
		return Ok(());
	}

	let data = BufReader::new(File::open(&args[1])?);
	let (file, warnings) = import_from_stream(data, ImportCfg::default())?;

	info!(kind = ?file.kind, version = %file.version, entities = file.entities.len(),
		warnings = warnings.len(), "imported");

	println!("{:#?}", file);
	for warning in warnings.iter() {
		println!("warning: {}", warning);
	}

	Ok(())
}
