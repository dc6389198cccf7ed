// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Parser;
use std::time::Duration;

use demos::{board, poll_for, print_stats, print_status, Chip, SimPhy};
use mxl371x::{
    Error, Guid, HostInterface, Mxl371x, PlatformConfig, SharedPhy, StaticFirmware, StdDelay,
};

use log::Level;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Interface {
    Sgmii,
    Hsgmii,
    #[value(name = "1000base-x")]
    Base1000X,
}

impl From<Interface> for HostInterface {
    fn from(i: Interface) -> Self {
        match i {
            Interface::Sgmii => HostInterface::Sgmii,
            Interface::Hsgmii => HostInterface::Hsgmii,
            Interface::Base1000X => HostInterface::Base1000X,
        }
    }
}

#[derive(Clone, clap::Subcommand, Debug)]
enum Mode {
    /// Bring the PHY up and print what was found
    Init,
    /// Read the die temperature
    Temp,
    /// Print the MoCA link status
    Status,
    /// Print the GUID, or set a new one
    Guid { guid: Option<Guid> },
    /// Run the statistics poller
    Poll {
        #[arg(short = 't', long, default_value_t = 5)]
        seconds: u32,
        /// poll period in milliseconds
        #[arg(long, default_value_t = 1000)]
        period: u64,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[arg(short, long, value_enum, default_value_t = Chip::Leucadia)]
    chip: Chip,

    /// start with the firmware not running
    #[arg(long)]
    cold: bool,

    /// GUID to use when the hardware has none
    #[arg(short, long)]
    guid: Option<Guid>,

    #[arg(short, long, value_enum)]
    interface: Option<Interface>,
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    let log_level = match cli.debug {
        1 => Level::Info,
        2 => Level::Debug,
        3 => Level::Trace,
        _ => Level::Warn,
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.to_string()),
    )
    .init();
    log::info!("Starting MoCA PHY simulation");

    let mut config = PlatformConfig::default();
    if let Some(guid) = cli.guid {
        config = config.with_guid(guid);
    }
    if let Some(interface) = cli.interface {
        config = config.with_interface(interface.into());
    }

    let image = vec![0u8; 64 * 1024];
    let mut phy: SimPhy = Mxl371x::new(board(cli.chip, !cli.cold), StdDelay);
    let report = phy.init(&config, &mut StaticFirmware(&image), &mut rand::rng())?;

    match cli.mode {
        Mode::Init => {
            if let Some(info) = phy.info() {
                println!("{} ({})", info.version(), info.firmware_name());
            }
            println!("boot:      {:?}", report.boot);
            println!("interface: {} @ {} Mbps", report.interface, report.interface.speed_mbps());
            match report.guid {
                Some((guid, source)) => println!("guid:      {} ({:?})", guid, source),
                None => println!("guid:      not set"),
            }
        }
        Mode::Temp => println!("{}", phy.read_temperature()?),
        Mode::Status => {
            println!("link up:   {}", phy.read_link());
            print_status(phy.status());
        }
        Mode::Guid { guid: None } => println!("{}", phy.guid()?),
        Mode::Guid { guid: Some(guid) } => {
            phy.set_guid(guid)?;
            println!("{}", phy.guid()?);
        }
        Mode::Poll { seconds, period } => {
            phy.attach(Guid::new([0x00, 0x24, 0x3e, 0x00, 0x00, 0x01]));
            let mut shared = SharedPhy::new(phy);
            poll_for(&mut shared, seconds, Duration::from_millis(period))?;
            print_stats(&shared.lock().phy_stats());
            shared.remove();
        }
    }
    Ok(())
}
