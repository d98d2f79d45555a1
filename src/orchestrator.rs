use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::commands::{host_url, Builder, SessionEnv};
use crate::config::AppConfig;
use crate::executor::{CommandRunner, Executor};
use crate::models::{ConnectionParams, Invocation, Operation, OperationRequest};
use crate::registry::{Registry, SecretStore};
use crate::resolver::Resolver;

/// Drives one invocation: resolve, maybe wake the host, then run the
/// requested operation. Returns the process exit code.
///
/// Resolution failures come back as `Err` carrying a
/// [`crate::error::Error`]; tool exit codes come back as `Ok`.
pub struct Orchestrator<'a, S, R> {
    config: &'a AppConfig,
    registry: Registry<S>,
    executor: Executor<R>,
    session: SessionEnv,
}

impl<'a, S: SecretStore, R: CommandRunner> Orchestrator<'a, S, R> {
    pub fn new(
        config: &'a AppConfig,
        registry: Registry<S>,
        executor: Executor<R>,
        session: SessionEnv,
    ) -> Self {
        Self {
            config,
            registry,
            executor,
            session,
        }
    }

    pub async fn run(&mut self, invocation: &Invocation) -> Result<i32> {
        let request = &invocation.request;
        let mut wakeup = invocation.wakeup;

        if !wakeup && request.kind.is_none() {
            debug!("Nothing requested");
            return Ok(0);
        }

        let config = self.config;
        let resolver = Resolver::new(&self.registry, &invocation.overrides, &config.defaults);
        resolver.check_host().await?;
        let conn = resolver.connection().await?;
        info!(
            "Target {}",
            host_url(conn.user.as_deref(), &conn.address, conn.port, true)
        );

        if request.kind == Some(Operation::Url) {
            return Ok(self.print_url(&conn));
        }

        let builder = Builder::new(&config.tools, &config.defaults);
        let dry_run = self.executor.dry_run();

        if wakeup {
            let code = self.executor.execute(&builder.status(&conn)).await?;
            if !dry_run {
                if code == 0 {
                    self.executor.console().err("Host is online, wakeup is cancelled");
                    wakeup = false;
                } else {
                    self.executor.console().err("Host is offline");
                }
                self.executor.console().err("");
            }
        }

        if wakeup {
            let params = resolver.wakeup().await?;
            let code = self
                .executor
                .execute(&builder.wakeup(&params, Some(&conn.address)))
                .await?;

            if !dry_run {
                self.executor
                    .console()
                    .err(format!("  finished with code {code}"));

                if request.kind.is_none() {
                    return Ok(code);
                }

                let console = self.executor.console();
                console.err("");
                console.err(format!(
                    "Waiting {} seconds for host to wake up...",
                    params.delay
                ));
                tokio::time::sleep(Duration::from_secs(params.delay)).await;
                console.err("Remote host must be awake now.");
                console.err("");
            }
        }

        let Some(kind) = request.kind else {
            return Ok(0);
        };
        self.dispatch(&builder, kind, &conn, request).await
    }

    async fn dispatch(
        &mut self,
        builder: &Builder<'_>,
        kind: Operation,
        conn: &ConnectionParams,
        request: &OperationRequest,
    ) -> Result<i32> {
        let tunnel_arg = request.tunnel_arg.as_deref();
        let local_path = request.local_path.as_deref();
        let remote_path = request.remote_path.as_deref();

        let command = match kind {
            Operation::Url => return Ok(self.print_url(conn)),
            Operation::Status => {
                let code = self.executor.execute(&builder.status(conn)).await?;
                if !self.executor.dry_run() {
                    self.executor.console().err(format!(
                        "Host is {}",
                        if code == 0 { "online" } else { "offline" }
                    ));
                }
                return Ok(code);
            }
            Operation::Ssh => builder.ssh(conn, &self.session, &request.ssh_opts, &request.ssh_command),
            Operation::Tunnel => builder.tunnel(conn, &self.session, &request.ssh_opts, tunnel_arg),
            Operation::ReverseTunnel => {
                builder.reverse_tunnel(conn, &self.session, &request.ssh_opts, tunnel_arg)
            }
            Operation::Mount => builder.mount(conn, local_path, remote_path, &request.sshfs_opts),
            Operation::Download => builder.copy(
                conn,
                false,
                local_path,
                remote_path,
                &request.ssh_opts,
                &request.rsync_opts,
            ),
            Operation::Upload => builder.copy(
                conn,
                true,
                local_path,
                remote_path,
                &request.ssh_opts,
                &request.rsync_opts,
            ),
        };

        self.executor.execute(&command).await
    }

    fn print_url(&self, conn: &ConnectionParams) -> i32 {
        self.executor
            .console()
            .out(host_url(conn.user.as_deref(), &conn.address, conn.port, true));
        0
    }

    #[cfg(test)]
    fn executor(&self) -> &Executor<R> {
        &self.executor
    }
}
