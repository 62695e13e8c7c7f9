// Copyright 2020 The Sparv Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Main for building the binary of the sparv command line wallet.

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::error;

use sparv_util::init_logger;
use sparv_wallet::controller;

fn main() {
	init_logger(None);

	let args = App::new("sparv")
		.version("0.1.0")
		.about("Minimal SPV wallet for the Bitcoin testnet")
		.setting(AppSettings::SubcommandRequiredElseHelp)
		.subcommand(
			SubCommand::with_name("show")
				.about("Show the wallet address, creating the key on first run"),
		)
		.subcommand(
			SubCommand::with_name("balance").about("Show the confirmed balance in satoshi"),
		)
		.subcommand(
			SubCommand::with_name("send")
				.about("Build, sign and broadcast a transaction")
				.arg(
					Arg::with_name("address")
						.help("Destination address")
						.required(true),
				)
				.arg(
					Arg::with_name("amount")
						.help("Amount in satoshi")
						.required(true),
				)
				.arg(Arg::with_name("fee").help("Fee in satoshi").required(true)),
		)
		.get_matches();

	if let Err(e) = run(&args) {
		error!("{}", e);
		std::process::exit(1);
	}
}

fn run(args: &ArgMatches<'_>) -> Result<(), String> {
	match args.subcommand() {
		("show", _) => {
			let addr = controller::show_address().map_err(|e| e.to_string())?;
			println!("{}", addr);
			Ok(())
		}
		("balance", _) => {
			let balance = controller::balance().map_err(|e| e.to_string())?;
			println!("{}", balance);
			Ok(())
		}
		("send", Some(send_args)) => {
			let address = send_args.value_of("address").expect("required arg");
			let amount = parse_satoshi(send_args.value_of("amount").expect("required arg"))?;
			let fee = parse_satoshi(send_args.value_of("fee").expect("required arg"))?;
			let txid = controller::send(address, amount, fee).map_err(|e| e.to_string())?;
			println!("{}", txid);
			Ok(())
		}
		_ => Err("unknown command".to_string()),
	}
}

fn parse_satoshi(input: &str) -> Result<u64, String> {
	input
		.parse::<u64>()
		.map_err(|_| format!("invalid satoshi amount: {}", input))
}
