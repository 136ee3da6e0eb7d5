//! The `triage` launcher: reads a pipeline configuration, resolves every
//! named module against the built-in registries, wires workers up under the
//! configured concurrency binding, and drives them through the lifecycle
//! controller until shutdown.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use triage_dispatcher::{Dispatcher, LifecycleController};
use triage_logging::LogConfig;
use triage_protocol::{Kind, ModuleEntry, PipelineConfig, ALL_KINDS};
use triage_queue::{
    ipc_endpoint, Command, ObjectQueue, ProcLock, ProcessQueue, ThreadProcLock, ThreadQueue,
    ZmqProcLock, ZmqProcLockServer, ZmqWorkerLock,
};
use triage_worker::{
    run_sink_loop, run_transformer_loop, Producer, Registry, Sink, Transformer, WorkerContext,
    WorkerHandle,
};

#[derive(Parser, Debug)]
#[command(name = "triage", about = "Recursive dispatch pipeline for log triage and enrichment")]
struct Cli {
    /// Path to the JSON pipeline configuration, or "-" for stdin
    config: Option<String>,

    /// Raise log verbosity (debug to stderr in addition to the rolling file)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Format-substitution pairs: KEY VAL KEY VAL ...
    #[arg(long = "template", num_args = 0..)]
    template: Vec<String>,

    /// Internal: re-exec entry point for a single worker under the process
    /// binding. Not part of the public interface.
    #[arg(long = "internal-worker-spec", hide = true)]
    internal_worker_spec: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum Role {
    Producer,
    Transformer,
    Sink,
}

#[derive(Debug, Serialize, Deserialize)]
struct WorkerSpawnSpec {
    role: Role,
    name: String,
    module: String,
    args: BTreeMap<String, Value>,
    start_ttl: i64,
    base_dir: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(spec_json) = cli.internal_worker_spec.clone() {
        return match run_internal_worker(&spec_json) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e:?}");
                ExitCode::from(1)
            }
        };
    }

    match run_launcher(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:?}");
            ExitCode::from(1)
        }
    }
}

fn build_registry() -> Result<Registry> {
    let mut registry = Registry::new();
    triage_sources::register_all(&mut registry)?;
    triage_transformers::register_all(&mut registry)?;
    triage_sinks::register_all(&mut registry)?;
    Ok(registry)
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let path = cli
        .config
        .as_deref()
        .context("missing required argument: path to pipeline config (or '-' for stdin)")?;

    let mut config = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read pipeline config from stdin")?;
        PipelineConfig::from_str(&buf)?
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline config '{path}'"))?;
        PipelineConfig::from_str(&text)?
    };

    let template = triage_protocol::config::template_from_pairs(&cli.template)?;
    config.apply_template(&template)?;
    Ok(config)
}

fn run_launcher(cli: Cli) -> Result<()> {
    triage_logging::init_logging(LogConfig {
        app_name: "triage",
        verbose: cli.debug,
        tui_mode: false,
    })?;

    let config = load_config(&cli)?;
    let registry = build_registry()?;

    let base_dir = std::env::temp_dir().join(format!("triage-{}", std::process::id()));
    if config.binding == triage_protocol::Binding::Process {
        std::fs::create_dir_all(&base_dir)
            .with_context(|| format!("failed to create IPC socket dir {}", base_dir.display()))?;
    }

    let shutdown_requested = Arc::new(AtomicBool::new(false));
    install_signal_handlers(Arc::clone(&shutdown_requested))?;

    let funnel = spawn_funnel(config.binding, &base_dir)?;

    let mut producers = Vec::new();
    for entry in &config.input_modules {
        producers.push(spawn_producer(
            &registry,
            entry,
            config.start_ttl,
            config.binding,
            &base_dir,
        )?);
    }

    let mut transformers = Vec::new();
    for entry in &config.reemitter_modules {
        transformers.push(spawn_transformer(
            &registry,
            entry,
            config.start_ttl,
            config.binding,
            &base_dir,
        )?);
    }

    let mut sinks = Vec::new();
    for entry in &config.output_modules {
        sinks.push(spawn_sink(
            &registry,
            entry,
            config.start_ttl,
            config.binding,
            &base_dir,
        )?);
    }

    let dispatcher = Dispatcher {
        funnel,
        producers,
        transformers,
        sinks,
    };

    let mut controller = LifecycleController::new(dispatcher, shutdown_requested);
    controller.run();

    if config.binding == triage_protocol::Binding::Process {
        let _ = std::fs::remove_dir_all(&base_dir);
    }

    Ok(())
}

fn install_signal_handlers(shutdown_requested: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            tracing::info!(target: "triage", signal = sig, "received shutdown signal");
            shutdown_requested.store(true, Ordering::SeqCst);
        }
    });
    Ok(())
}

/// Queue/lock quadruple as seen from the dispatcher side: the ends that go
/// into a `WorkerHandle`.
struct DispatcherSideLinks {
    to_worker: Arc<dyn ObjectQueue<triage_protocol::Object>>,
    from_worker: Arc<dyn ObjectQueue<triage_protocol::Object>>,
    cmd_queue: Arc<dyn ObjectQueue<Command>>,
    proc_lock: Arc<dyn ProcLock>,
}

/// The same quadruple as seen from the worker side: the ends that go into a
/// `WorkerContext`. For the thread binding these are literally the same
/// `Arc`s as the dispatcher side; for the process binding they are the
/// opposite end of the wire.
struct WorkerSideLinks {
    recv_queue: Arc<dyn ObjectQueue<triage_protocol::Object>>,
    send_queue: Arc<dyn ObjectQueue<triage_protocol::Object>>,
    cmd_queue: Arc<dyn ObjectQueue<Command>>,
    proc_lock: Arc<dyn ProcLock>,
}

fn thread_links() -> (DispatcherSideLinks, WorkerSideLinks) {
    let to_worker: Arc<dyn ObjectQueue<triage_protocol::Object>> =
        Arc::new(ThreadQueue::unbounded());
    let from_worker: Arc<dyn ObjectQueue<triage_protocol::Object>> =
        Arc::new(ThreadQueue::unbounded());
    let cmd_queue: Arc<dyn ObjectQueue<Command>> = Arc::new(ThreadQueue::unbounded());
    let proc_lock: Arc<dyn ProcLock> = Arc::new(ThreadProcLock::new());

    let dispatcher_side = DispatcherSideLinks {
        to_worker: Arc::clone(&to_worker),
        from_worker: Arc::clone(&from_worker),
        cmd_queue: Arc::clone(&cmd_queue),
        proc_lock: Arc::clone(&proc_lock),
    };
    let worker_side = WorkerSideLinks {
        recv_queue: to_worker,
        send_queue: from_worker,
        cmd_queue,
        proc_lock,
    };
    (dispatcher_side, worker_side)
}

/// Build the dispatcher side's view of a process-bound worker's queues.
/// The worker's own `WorkerContext` is assembled later, inside the child
/// process, from the same `base_dir` and `name` via `ipc_endpoint`.
fn process_dispatcher_links(
    zmq_ctx: &zmq::Context,
    base_dir: &std::path::Path,
    name: &str,
) -> Result<DispatcherSideLinks> {
    let to_worker_ep = ipc_endpoint(base_dir, name, "to-worker");
    let from_worker_ep = ipc_endpoint(base_dir, name, "from-worker");
    let cmd_ep = ipc_endpoint(base_dir, name, "cmd");
    let lock_ep = ipc_endpoint(base_dir, name, "lock");

    let to_worker: Arc<dyn ObjectQueue<triage_protocol::Object>> =
        Arc::new(ProcessQueue::connect_push(zmq_ctx, &to_worker_ep)?);
    let from_worker: Arc<dyn ObjectQueue<triage_protocol::Object>> =
        Arc::new(ProcessQueue::bind_pull(zmq_ctx, &from_worker_ep)?);
    let cmd_queue: Arc<dyn ObjectQueue<Command>> =
        Arc::new(ProcessQueue::connect_push(zmq_ctx, &cmd_ep)?);
    let proc_lock: Arc<dyn ProcLock> =
        Arc::new(ZmqProcLock::new(zmq_ctx.clone(), lock_ep));

    Ok(DispatcherSideLinks {
        to_worker,
        from_worker,
        cmd_queue,
        proc_lock,
    })
}

/// Mirror of `process_dispatcher_links`, built inside the child process.
fn process_worker_links(
    zmq_ctx: &zmq::Context,
    base_dir: &std::path::Path,
    name: &str,
) -> Result<WorkerSideLinks> {
    let to_worker_ep = ipc_endpoint(base_dir, name, "to-worker");
    let from_worker_ep = ipc_endpoint(base_dir, name, "from-worker");
    let cmd_ep = ipc_endpoint(base_dir, name, "cmd");
    let lock_ep = ipc_endpoint(base_dir, name, "lock");

    let recv_queue: Arc<dyn ObjectQueue<triage_protocol::Object>> =
        Arc::new(ProcessQueue::bind_pull(zmq_ctx, &to_worker_ep)?);
    let send_queue: Arc<dyn ObjectQueue<triage_protocol::Object>> =
        Arc::new(ProcessQueue::connect_push(zmq_ctx, &from_worker_ep)?);
    let cmd_queue: Arc<dyn ObjectQueue<Command>> =
        Arc::new(ProcessQueue::bind_pull(zmq_ctx, &cmd_ep)?);
    let proc_lock: Arc<dyn ProcLock> = Arc::new(ZmqWorkerLock::new(ZmqProcLockServer::bind(
        zmq_ctx, &lock_ep,
    )?));

    Ok(WorkerSideLinks {
        recv_queue,
        send_queue,
        cmd_queue,
        proc_lock,
    })
}

fn spawn_process_worker(spec: WorkerSpawnSpec) -> Result<std::process::Child> {
    let exe = std::env::current_exe().context("failed to resolve current executable path")?;
    let spec_json = serde_json::to_string(&spec)?;
    std::process::Command::new(exe)
        .arg("-")
        .arg("--internal-worker-spec")
        .arg(spec_json)
        .spawn()
        .with_context(|| format!("failed to spawn worker process '{}'", spec.name))
}

fn spawn_funnel(
    binding: triage_protocol::Binding,
    base_dir: &std::path::Path,
) -> Result<WorkerHandle> {
    let name = triage_worker::FUNNEL_NAME.to_string();
    let time_to_die = Arc::new(AtomicBool::new(false));

    match binding {
        triage_protocol::Binding::Thread => {
            let (dispatcher_side, worker_side) = thread_links();
            let ctx = WorkerContext {
                name: name.clone(),
                start_ttl: 0,
                send_queue: worker_side.send_queue,
                recv_queue: worker_side.recv_queue,
                cmd_queue: worker_side.cmd_queue,
                proc_lock: worker_side.proc_lock,
            };
            let ttd = Arc::clone(&time_to_die);
            let join = thread::spawn(move || {
                triage_dispatcher::run_funnel_loop(&ctx, &ttd);
            });
            Ok(WorkerHandle::new(
                name,
                dispatcher_side.to_worker,
                dispatcher_side.from_worker,
                dispatcher_side.cmd_queue,
                dispatcher_side.proc_lock,
                None,
                join,
            ))
        }
        triage_protocol::Binding::Process => {
            let zmq_ctx = zmq::Context::new();
            let dispatcher_side = process_dispatcher_links(&zmq_ctx, base_dir, &name)?;
            let spec = WorkerSpawnSpec {
                role: Role::Producer,
                name: name.clone(),
                module: triage_worker::FUNNEL_NAME.to_string(),
                args: BTreeMap::new(),
                start_ttl: 0,
                base_dir: base_dir.to_path_buf(),
            };
            let child = spawn_process_worker(spec)?;
            let join = thread::spawn(move || {
                let mut child = child;
                let _ = child.wait();
            });
            Ok(WorkerHandle::new(
                name,
                dispatcher_side.to_worker,
                dispatcher_side.from_worker,
                dispatcher_side.cmd_queue,
                dispatcher_side.proc_lock,
                None,
                join,
            ))
        }
    }
}

fn spawn_producer(
    registry: &Registry,
    entry: &ModuleEntry,
    start_ttl: i64,
    binding: triage_protocol::Binding,
    base_dir: &std::path::Path,
) -> Result<WorkerHandle> {
    match binding {
        triage_protocol::Binding::Thread => {
            let mut producer = registry
                .build_producer(&entry.name, &entry.args)
                .with_context(|| format!("failed to construct producer '{}'", entry.name))?;
            let (dispatcher_side, worker_side) = thread_links();
            let ctx = WorkerContext {
                name: entry.name.clone(),
                start_ttl,
                send_queue: worker_side.send_queue,
                recv_queue: worker_side.recv_queue,
                cmd_queue: worker_side.cmd_queue,
                proc_lock: worker_side.proc_lock,
            };
            let time_to_die = Arc::new(AtomicBool::new(false));
            let name = entry.name.clone();
            let join = thread::spawn(move || {
                if let Err(e) = producer.run(&ctx, &time_to_die) {
                    tracing::error!(target: "triage", producer = %name, error = %e, "producer crashed");
                }
            });
            Ok(WorkerHandle::new(
                entry.name.clone(),
                dispatcher_side.to_worker,
                dispatcher_side.from_worker,
                dispatcher_side.cmd_queue,
                dispatcher_side.proc_lock,
                None,
                join,
            ))
        }
        triage_protocol::Binding::Process => {
            let zmq_ctx = zmq::Context::new();
            let dispatcher_side = process_dispatcher_links(&zmq_ctx, base_dir, &entry.name)?;
            let spec = WorkerSpawnSpec {
                role: Role::Producer,
                name: entry.name.clone(),
                module: entry.name.clone(),
                args: entry.args.clone(),
                start_ttl,
                base_dir: base_dir.to_path_buf(),
            };
            let child = spawn_process_worker(spec)?;
            let join = thread::spawn(move || {
                let mut child = child;
                let _ = child.wait();
            });
            Ok(WorkerHandle::new(
                entry.name.clone(),
                dispatcher_side.to_worker,
                dispatcher_side.from_worker,
                dispatcher_side.cmd_queue,
                dispatcher_side.proc_lock,
                None,
                join,
            ))
        }
    }
}

fn spawn_transformer(
    registry: &Registry,
    entry: &ModuleEntry,
    start_ttl: i64,
    binding: triage_protocol::Binding,
    base_dir: &std::path::Path,
) -> Result<WorkerHandle> {
    let probe = registry
        .build_transformer(&entry.name, &entry.args)
        .with_context(|| format!("failed to construct transformer '{}'", entry.name))?;
    let declared_kinds: HashSet<Kind> = ALL_KINDS
        .iter()
        .copied()
        .filter(|k| probe.accepts(*k))
        .collect();
    drop(probe);

    match binding {
        triage_protocol::Binding::Thread => {
            let mut transformer = registry.build_transformer(&entry.name, &entry.args)?;
            let (dispatcher_side, worker_side) = thread_links();
            let ctx = WorkerContext {
                name: entry.name.clone(),
                start_ttl,
                send_queue: worker_side.send_queue,
                recv_queue: worker_side.recv_queue,
                cmd_queue: worker_side.cmd_queue,
                proc_lock: worker_side.proc_lock,
            };
            let time_to_die = Arc::new(AtomicBool::new(false));
            let join = thread::spawn(move || {
                run_transformer_loop(&ctx, transformer.as_mut(), &time_to_die);
            });
            Ok(WorkerHandle::new(
                entry.name.clone(),
                dispatcher_side.to_worker,
                dispatcher_side.from_worker,
                dispatcher_side.cmd_queue,
                dispatcher_side.proc_lock,
                Some(declared_kinds),
                join,
            ))
        }
        triage_protocol::Binding::Process => {
            let zmq_ctx = zmq::Context::new();
            let dispatcher_side = process_dispatcher_links(&zmq_ctx, base_dir, &entry.name)?;
            let spec = WorkerSpawnSpec {
                role: Role::Transformer,
                name: entry.name.clone(),
                module: entry.name.clone(),
                args: entry.args.clone(),
                start_ttl,
                base_dir: base_dir.to_path_buf(),
            };
            let child = spawn_process_worker(spec)?;
            let join = thread::spawn(move || {
                let mut child = child;
                let _ = child.wait();
            });
            Ok(WorkerHandle::new(
                entry.name.clone(),
                dispatcher_side.to_worker,
                dispatcher_side.from_worker,
                dispatcher_side.cmd_queue,
                dispatcher_side.proc_lock,
                Some(declared_kinds),
                join,
            ))
        }
    }
}

fn spawn_sink(
    registry: &Registry,
    entry: &ModuleEntry,
    start_ttl: i64,
    binding: triage_protocol::Binding,
    base_dir: &std::path::Path,
) -> Result<WorkerHandle> {
    let probe = registry
        .build_sink(&entry.name, &entry.args)
        .with_context(|| format!("failed to construct sink '{}'", entry.name))?;
    let declared_kinds: HashSet<Kind> = ALL_KINDS
        .iter()
        .copied()
        .filter(|k| probe.accepts(*k))
        .collect();
    drop(probe);

    match binding {
        triage_protocol::Binding::Thread => {
            let mut sink = registry.build_sink(&entry.name, &entry.args)?;
            let (dispatcher_side, worker_side) = thread_links();
            let ctx = WorkerContext {
                name: entry.name.clone(),
                start_ttl,
                send_queue: worker_side.send_queue,
                recv_queue: worker_side.recv_queue,
                cmd_queue: worker_side.cmd_queue,
                proc_lock: worker_side.proc_lock,
            };
            let time_to_die = Arc::new(AtomicBool::new(false));
            let join = thread::spawn(move || {
                run_sink_loop(&ctx, sink.as_mut(), &time_to_die);
            });
            Ok(WorkerHandle::new(
                entry.name.clone(),
                dispatcher_side.to_worker,
                dispatcher_side.from_worker,
                dispatcher_side.cmd_queue,
                dispatcher_side.proc_lock,
                Some(declared_kinds),
                join,
            ))
        }
        triage_protocol::Binding::Process => {
            let zmq_ctx = zmq::Context::new();
            let dispatcher_side = process_dispatcher_links(&zmq_ctx, base_dir, &entry.name)?;
            let spec = WorkerSpawnSpec {
                role: Role::Sink,
                name: entry.name.clone(),
                module: entry.name.clone(),
                args: entry.args.clone(),
                start_ttl,
                base_dir: base_dir.to_path_buf(),
            };
            let child = spawn_process_worker(spec)?;
            let join = thread::spawn(move || {
                let mut child = child;
                let _ = child.wait();
            });
            Ok(WorkerHandle::new(
                entry.name.clone(),
                dispatcher_side.to_worker,
                dispatcher_side.from_worker,
                dispatcher_side.cmd_queue,
                dispatcher_side.proc_lock,
                Some(declared_kinds),
                join,
            ))
        }
    }
}

/// Entry point when this binary was re-exec'd to run a single worker under
/// the process binding. The funnel re-exec resolves `module ==
/// triage_worker::FUNNEL_NAME` specially since it has no registry entry.
fn run_internal_worker(spec_json: &str) -> Result<()> {
    let spec: WorkerSpawnSpec =
        serde_json::from_str(spec_json).context("malformed internal worker spec")?;

    triage_logging::init_logging(LogConfig {
        app_name: &spec.name,
        verbose: false,
        tui_mode: false,
    })?;

    let zmq_ctx = zmq::Context::new();
    let links = process_worker_links(&zmq_ctx, &spec.base_dir, &spec.name)?;
    let ctx = WorkerContext {
        name: spec.name.clone(),
        start_ttl: spec.start_ttl,
        send_queue: links.send_queue,
        recv_queue: links.recv_queue,
        cmd_queue: links.cmd_queue,
        proc_lock: links.proc_lock,
    };
    let time_to_die = AtomicBool::new(false);

    if spec.module == triage_worker::FUNNEL_NAME {
        triage_dispatcher::run_funnel_loop(&ctx, &time_to_die);
        return Ok(());
    }

    let registry = build_registry()?;
    match spec.role {
        Role::Producer => {
            let mut producer = registry.build_producer(&spec.module, &spec.args)?;
            producer.run(&ctx, &time_to_die)?;
        }
        Role::Transformer => {
            let mut transformer = registry.build_transformer(&spec.module, &spec.args)?;
            run_transformer_loop(&ctx, transformer.as_mut(), &time_to_die);
        }
        Role::Sink => {
            let mut sink = registry.build_sink(&spec.module, &spec.args)?;
            run_sink_loop(&ctx, sink.as_mut(), &time_to_die);
        }
    }

    Ok(())
}
