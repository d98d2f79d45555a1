use clap::ValueEnum;

/// Which half of a host's registry entry to read scoped attributes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    Global,
}

impl Scope {
    pub fn from_lan(lan: bool) -> Self {
        if lan {
            Scope::Local
        } else {
            Scope::Global
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Global => "global",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    /// Print the ssh:// URL of the host
    Url,
    /// Check whether the ssh port is open
    #[value(name = "stat")]
    Status,
    /// Open an ssh session
    Ssh,
    /// Dynamic (SOCKS) forward tunnel
    Tunnel,
    /// Reverse tunnel
    #[value(name = "rtunnel")]
    ReverseTunnel,
    /// Mount a remote directory with sshfs
    Mount,
    /// Copy from the host with rsync
    Download,
    /// Copy to the host with rsync
    Upload,
}

/// Where to connect. `address` is always present once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub address: String,
    pub port: Option<u16>,
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeupParams {
    pub mac: String,
    pub port: u16,
    pub delay: u64,
}

/// Values given explicitly on the command line, before any registry lookup.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub lan: bool,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub wakeup_mac: Option<String>,
    pub wakeup_port: Option<u16>,
    pub wakeup_delay: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct OperationRequest {
    pub kind: Option<Operation>,
    pub ssh_command: Vec<String>,
    pub tunnel_arg: Option<String>,
    pub local_path: Option<String>,
    pub remote_path: Option<String>,
    pub ssh_opts: Vec<String>,
    pub sshfs_opts: Vec<String>,
    pub rsync_opts: Vec<String>,
}

/// One full invocation: what to resolve, whether to wake, what to run.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub overrides: Overrides,
    pub wakeup: bool,
    pub dry_run: bool,
    pub request: OperationRequest,
}
