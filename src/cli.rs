use std::path::PathBuf;

use clap::{ArgAction, Args, Parser};

use crate::models::{Invocation, Operation, OperationRequest, Overrides};
use crate::validate;

/// Remote host control
///
/// Looks the host up in the registry (`pass` by default), optionally wakes it
/// with a magic packet, then runs one operation against it.
///
/// Examples:
///   remote -h nas -o ssh
///   remote -h nas -L -w -o mount -l ~/mnt/nas
///   remote -s 10.0.0.5 -p 22 -o stat
///   remote -h nas -o download -r /srv/backup/ -l ./backup/ -n
#[derive(Parser, Debug)]
#[command(
    name = "remote",
    version,
    about = "Remote host control",
    disable_help_flag = true
)]
pub struct Cli {
    /// Show this help message and exit
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Don't do anything, only print commands to be executed
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Configuration file (default: <config dir>/remote/remote.toml)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the effective configuration to the config file and exit
    #[arg(long = "write-config")]
    pub write_config: bool,

    #[command(flatten, next_help_heading = "Host registry")]
    pub registry: RegistryArgs,

    #[command(flatten, next_help_heading = "Address")]
    pub address: AddressArgs,

    #[command(flatten, next_help_heading = "Wakeup")]
    pub wakeup: WakeupArgs,

    #[command(flatten, next_help_heading = "Operation")]
    pub operation: OperationArgs,
}

#[derive(Args, Debug)]
pub struct RegistryArgs {
    /// Access remote host using local address and port
    #[arg(short = 'L', long = "lan")]
    pub lan: bool,

    /// Registered name of known remote host
    #[arg(short = 'h', long = "host", value_name = "HOST", value_parser = validate::host_addr)]
    pub host: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddressArgs {
    /// Address (IP or domain name) of remote host
    #[arg(short = 's', long = "addr", value_name = "ADDR", value_parser = validate::host_addr)]
    pub address: Option<String>,

    /// Port of remote host
    #[arg(short = 'p', long = "port", value_name = "PORT", value_parser = validate::port)]
    pub port: Option<u16>,

    /// Remote user name
    #[arg(short = 'u', long = "user", value_name = "USER", value_parser = validate::user_name)]
    pub user: Option<String>,
}

#[derive(Args, Debug)]
pub struct WakeupArgs {
    /// Wake up remote host
    #[arg(short = 'w', long = "wakeup")]
    pub wakeup: bool,

    /// MAC address to wake up
    #[arg(short = 'm', long = "wakeup-mac", visible_alias = "mac", value_name = "MAC", value_parser = validate::mac_addr)]
    pub mac: Option<String>,

    /// Port to send magic packet to
    #[arg(id = "wakeup_port", short = 'P', long = "wakeup-port", value_name = "PORT", value_parser = validate::port)]
    pub port: Option<u16>,

    /// Time for remote host to wake up
    #[arg(short = 'd', long = "wakeup-delay", value_name = "SECONDS", value_parser = validate::seconds)]
    pub delay: Option<u64>,
}

#[derive(Args, Debug)]
pub struct OperationArgs {
    /// Operation type
    #[arg(short = 'o', long = "op", value_name = "OP_TYPE", value_enum)]
    pub kind: Option<Operation>,

    /// Ssh command to execute remotely
    #[arg(long = "cmd", value_name = "CMD", num_args = 1..)]
    pub ssh_command: Vec<String>,

    /// Ssh tunnel argument (port and/or binding address)
    #[arg(short = 't', long = "tunnel", value_name = "TUNNEL_ARG")]
    pub tunnel: Option<String>,

    /// Local path
    #[arg(short = 'l', long = "lpath", value_name = "PATH")]
    pub local_path: Option<String>,

    /// Remote path
    #[arg(short = 'r', long = "rpath", value_name = "PATH")]
    pub remote_path: Option<String>,

    /// Ssh option (repeatable)
    #[arg(long = "ssh-opts", value_name = "OPTION", allow_hyphen_values = true, action = ArgAction::Append)]
    pub ssh_opts: Vec<String>,

    /// Sshfs option (repeatable)
    #[arg(long = "sshfs-opts", value_name = "OPTION", allow_hyphen_values = true, action = ArgAction::Append)]
    pub sshfs_opts: Vec<String>,

    /// Rsync option (repeatable)
    #[arg(long = "rsync-opts", value_name = "OPTION", allow_hyphen_values = true, action = ArgAction::Append)]
    pub rsync_opts: Vec<String>,
}

impl Cli {
    pub fn invocation(&self) -> Invocation {
        Invocation {
            overrides: Overrides {
                host: self.registry.host.clone(),
                lan: self.registry.lan,
                address: self.address.address.clone(),
                port: self.address.port,
                user: self.address.user.clone(),
                wakeup_mac: self.wakeup.mac.clone(),
                wakeup_port: self.wakeup.port,
                wakeup_delay: self.wakeup.delay,
            },
            wakeup: self.wakeup.wakeup,
            dry_run: self.dry_run,
            request: OperationRequest {
                kind: self.operation.kind,
                ssh_command: self.operation.ssh_command.clone(),
                tunnel_arg: self.operation.tunnel.clone(),
                local_path: self.operation.local_path.clone(),
                remote_path: self.operation.remote_path.clone(),
                ssh_opts: self.operation.ssh_opts.clone(),
                sshfs_opts: self.operation.sshfs_opts.clone(),
                rsync_opts: self.operation.rsync_opts.clone(),
            },
        }
    }
}
