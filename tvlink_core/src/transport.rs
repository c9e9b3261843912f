use crate::error::Result;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};

pub const DEFAULT_ECP_PORT: u16 = 8060;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_millis(1500);
pub const DEFAULT_ADB_TIMEOUT: Duration = Duration::from_secs(5);

/// Fire-and-forget HTTP. Implementations must not block the caller.
pub trait HttpTransport: Send + Sync {
    fn post(&self, url: &str);
}

/// Fire-and-forget invocation of the adb tool; `args` exclude the program itself.
pub trait ShellTransport: Send + Sync {
    fn exec(&self, args: &[&str]);
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub adb_program: PathBuf,
    pub ecp_port: u16,
    pub http_timeout: Duration,
    /// Upper bound for one adb invocation; the child is killed past it.
    pub adb_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            adb_program: PathBuf::from("adb"),
            ecp_port: DEFAULT_ECP_PORT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            adb_timeout: DEFAULT_ADB_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `TVLINK_ADB`, `TVLINK_ECP_PORT`, `TVLINK_HTTP_TIMEOUT_MS`
    /// and `TVLINK_ADB_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(adb) = std::env::var("TVLINK_ADB") {
            let adb = adb.trim();
            if !adb.is_empty() {
                config.adb_program = PathBuf::from(adb);
            }
        }
        if let Some(port) = env_parse::<u16>("TVLINK_ECP_PORT") {
            config.ecp_port = port;
        }
        if let Some(ms) = env_parse::<u64>("TVLINK_HTTP_TIMEOUT_MS") {
            config.http_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("TVLINK_ADB_TIMEOUT_MS") {
            config.adb_timeout = Duration::from_millis(ms);
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(name, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

pub struct HttpClient {
    client: reqwest::Client,
    runtime: Handle,
    tasks: TaskTracker,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            runtime: Handle::try_current()?,
            tasks: TaskTracker::new(),
        })
    }

    async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

impl HttpTransport for HttpClient {
    fn post(&self, url: &str) {
        let client = self.client.clone();
        let url = url.to_string();
        self.tasks.spawn_on(
            async move {
                match client.post(&url).send().await {
                    Ok(resp) if resp.status().is_success() => trace!(%url, "ecp ok"),
                    Ok(resp) => debug!(%url, status = %resp.status(), "ecp request rejected"),
                    // Devices drop off the network all the time; not worth more than debug.
                    Err(e) => debug!(%url, error = %e, "ecp request failed"),
                }
            },
            &self.runtime,
        );
    }
}

enum ShellJob {
    Run(Vec<String>),
    Flush(oneshot::Sender<()>),
}

/// Runs adb commands one at a time, in the order they were issued. Each run is
/// cut off after `timeout` so a hung `connect` cannot hold up the queue.
pub struct AdbShell {
    tx: mpsc::UnboundedSender<ShellJob>,
}

impl AdbShell {
    pub fn spawn(program: PathBuf, timeout: Duration) -> Result<Self> {
        let runtime = Handle::try_current()?;
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_shell_worker(program, timeout, rx));
        Ok(Self { tx })
    }

    /// Resolves once every command issued before it has finished.
    async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(ShellJob::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl ShellTransport for AdbShell {
    fn exec(&self, args: &[&str]) {
        let job = ShellJob::Run(args.iter().map(|a| a.to_string()).collect());
        if self.tx.send(job).is_err() {
            warn!(?args, "adb worker is gone; command dropped");
        }
    }
}

async fn run_shell_worker(
    program: PathBuf,
    timeout: Duration,
    mut rx: mpsc::UnboundedReceiver<ShellJob>,
) {
    while let Some(job) = rx.recv().await {
        let args = match job {
            ShellJob::Run(args) => args,
            ShellJob::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let mut command = Command::new(&program);
        command.args(&args).stdin(Stdio::null()).kill_on_drop(true);
        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(output) => output,
            Err(_) => {
                warn!(
                    program = %program.display(),
                    ?args,
                    ?timeout,
                    "adb command timed out; killed"
                );
                continue;
            }
        };
        match output {
            Ok(out) if out.status.success() => {
                debug!(program = %program.display(), ?args, "adb ok");
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                warn!(
                    program = %program.display(),
                    ?args,
                    status = %out.status,
                    stderr = %stderr.trim(),
                    "adb command failed"
                );
            }
            Err(e) => {
                warn!(program = %program.display(), ?args, error = %e, "could not launch adb");
            }
        }
    }
}

/// The real transports, sharing the current tokio runtime.
#[derive(Clone)]
pub struct Transports {
    pub http: Arc<HttpClient>,
    pub shell: Arc<AdbShell>,
}

impl Transports {
    pub fn start(config: &TransportConfig) -> Result<Self> {
        Ok(Self {
            http: Arc::new(HttpClient::new(config.http_timeout)?),
            shell: Arc::new(AdbShell::spawn(
                config.adb_program.clone(),
                config.adb_timeout,
            )?),
        })
    }

    /// Waits (at most `limit`) for in-flight requests and queued adb commands.
    pub async fn drain(&self, limit: Duration) {
        let work = async {
            self.shell.flush().await;
            self.http.drain().await;
        };
        if tokio::time::timeout(limit, work).await.is_err() {
            debug!(?limit, "gave up waiting for in-flight remote commands");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Http(String),
    Shell(Vec<String>),
}

/// Records outbound traffic instead of sending it. Backs `--dry-run` and tests.
#[derive(Debug, Default)]
pub struct Recorder {
    log: Mutex<Vec<Outbound>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Vec<Outbound> {
        self.log.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<Outbound> {
        self.log
            .lock()
            .map(|mut g| std::mem::take(&mut *g))
            .unwrap_or_default()
    }

    pub fn http_urls(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Http(url) => Some(url),
                Outbound::Shell(_) => None,
            })
            .collect()
    }

    pub fn shell_commands(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Shell(args) => Some(args.join(" ")),
                Outbound::Http(_) => None,
            })
            .collect()
    }

    fn push(&self, entry: Outbound) {
        if let Ok(mut g) = self.log.lock() {
            g.push(entry);
        }
    }
}

impl HttpTransport for Recorder {
    fn post(&self, url: &str) {
        self.push(Outbound::Http(url.to_string()));
    }
}

impl ShellTransport for Recorder {
    fn exec(&self, args: &[&str]) {
        self.push(Outbound::Shell(args.iter().map(|a| a.to_string()).collect()));
    }
}
