//! Argument vectors for every external tool. Nothing here touches the
//! process or the environment; callers pass in what they read.

use std::fmt;

use crate::config::{Defaults, Tools};
use crate::models::{ConnectionParams, WakeupParams};

/// A program plus its arguments, and any environment it should add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

/// Space joined argv, the form shown to the user.
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// `[ssh://][user@]address[:port]`
pub fn host_url(user: Option<&str>, address: &str, port: Option<u16>, scheme: bool) -> String {
    let mut url = String::new();
    if scheme {
        url.push_str("ssh://");
    }
    if let Some(user) = user {
        url.push_str(user);
        url.push('@');
    }
    url.push_str(address);
    if let Some(port) = port {
        url.push_str(&format!(":{port}"));
    }
    url
}

fn target(conn: &ConnectionParams) -> String {
    host_url(conn.user.as_deref(), &conn.address, None, false)
}

/// Session settings read from the caller's environment once, up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnv {
    /// `TERM` to hand to ssh when the caller has none.
    pub fallback_term: Option<String>,
}

impl SessionEnv {
    pub fn from_term(current: Option<String>, default_term: &str) -> Self {
        Self {
            fallback_term: current.is_none().then(|| default_term.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Builder<'a> {
    tools: &'a Tools,
    defaults: &'a Defaults,
}

impl<'a> Builder<'a> {
    pub fn new(tools: &'a Tools, defaults: &'a Defaults) -> Self {
        Self { tools, defaults }
    }

    /// TCP connect check. Unknown port checks 22.
    pub fn status(&self, conn: &ConnectionParams) -> CommandLine {
        CommandLine::new(&self.tools.status)
            .arg("-w")
            .arg(self.defaults.status_timeout.to_string())
            .arg("-z")
            .arg(&conn.address)
            .arg(conn.port.unwrap_or(22).to_string())
    }

    pub fn wakeup(&self, wakeup: &WakeupParams, address: Option<&str>) -> CommandLine {
        let mut cmd = CommandLine::new(&self.tools.wakeup)
            .arg("-p")
            .arg(wakeup.port.to_string());
        if let Some(address) = address {
            cmd = cmd.arg("-i").arg(address);
        }
        cmd.arg(&wakeup.mac)
    }

    pub fn ssh(
        &self,
        conn: &ConnectionParams,
        session: &SessionEnv,
        opts: &[String],
        remote_cmd: &[String],
    ) -> CommandLine {
        let mut cmd = CommandLine::new(&self.tools.ssh).args(opts.iter().cloned());
        if let Some(port) = conn.port {
            cmd = cmd.arg("-p").arg(port.to_string());
        }
        if let Some(term) = &session.fallback_term {
            cmd = cmd.env("TERM", term);
        }
        cmd.arg(target(conn)).args(remote_cmd.iter().cloned())
    }

    /// `ssh -ND <arg>`, a SOCKS proxy on the local side.
    pub fn tunnel(
        &self,
        conn: &ConnectionParams,
        session: &SessionEnv,
        opts: &[String],
        tunnel_arg: Option<&str>,
    ) -> CommandLine {
        let arg = tunnel_arg.unwrap_or(&self.defaults.tunnel_arg);
        self.ssh(conn, session, &with_tunnel(opts, "-ND", arg), &[])
    }

    /// `ssh -NR <arg>`, exposing the local sshd on the remote side by default.
    pub fn reverse_tunnel(
        &self,
        conn: &ConnectionParams,
        session: &SessionEnv,
        opts: &[String],
        tunnel_arg: Option<&str>,
    ) -> CommandLine {
        let arg = tunnel_arg.unwrap_or(&self.defaults.rtunnel_arg);
        self.ssh(conn, session, &with_tunnel(opts, "-NR", arg), &[])
    }

    pub fn mount(
        &self,
        conn: &ConnectionParams,
        local_path: Option<&str>,
        remote_path: Option<&str>,
        opts: &[String],
    ) -> CommandLine {
        let remote = format!("{}:{}", target(conn), remote_path.unwrap_or(""));
        CommandLine::new(&self.tools.sshfs)
            .arg(remote)
            .arg(local_path.unwrap_or(&self.defaults.local_path))
            .args(opts.iter().cloned())
    }

    /// rsync over ssh. `upload` puts the local path first.
    pub fn copy(
        &self,
        conn: &ConnectionParams,
        upload: bool,
        local_path: Option<&str>,
        remote_path: Option<&str>,
        ssh_opts: &[String],
        rsync_opts: &[String],
    ) -> CommandLine {
        let mut shell = vec![self.tools.ssh.clone()];
        if let Some(port) = conn.port {
            shell.push("-p".to_string());
            shell.push(port.to_string());
        }
        shell.extend(ssh_opts.iter().cloned());

        let local = local_path
            .unwrap_or(&self.defaults.local_path)
            .to_string();
        let remote = format!(
            "{}:{}",
            target(conn),
            remote_path.unwrap_or(&self.defaults.remote_path)
        );
        let (src, dst) = if upload {
            (local, remote)
        } else {
            (remote, local)
        };

        CommandLine::new(&self.tools.rsync)
            .arg("-vP")
            .args(rsync_opts.iter().cloned())
            .arg("-e")
            .arg(shell.join(" "))
            .arg(src)
            .arg(dst)
    }
}

fn with_tunnel(opts: &[String], flag: &str, arg: &str) -> Vec<String> {
    let mut opts = opts.to_vec();
    opts.push(flag.to_string());
    opts.push(arg.to_string());
    opts
}
