use lumalink_session::{Supervisor, SupervisorConfig};
use lumalink_transport::{DeviceProfile, LineChannel, RadioConnector, TextChannel, WsChannel};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cmd::{parse_duration, ChannelKind, ServeArgs};
use crate::exit::{channel_error, CliError, CliResult, SUCCESS, USAGE};

#[cfg(feature = "ble")]
pub fn run(args: ServeArgs) -> CliResult<i32> {
    let config = supervisor_config(&args)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| crate::exit::io_error("runtime setup failed", err))?;

    runtime.block_on(async {
        let shutdown = shutdown_on_interrupt();
        serve(
            lumalink_transport::BleConnector::new(),
            args.channel,
            &args.listen,
            config,
            shutdown,
        )
        .await
    })
}

#[cfg(not(feature = "ble"))]
pub fn run(args: ServeArgs) -> CliResult<i32> {
    supervisor_config(&args)?;
    Err(CliError::new(
        USAGE,
        "radio support is not compiled in; rebuild with `--features ble`",
    ))
}

/// Build the supervisor configuration, rejecting malformed durations and UUIDs.
pub fn supervisor_config(args: &ServeArgs) -> CliResult<SupervisorConfig> {
    let device = DeviceProfile {
        address: args.address.trim().to_uppercase(),
        notify_characteristic: parse_uuid("notify UUID", &args.notify_uuid)?,
        write_characteristic: parse_uuid("write UUID", &args.write_uuid)?,
    };
    if device.address.is_empty() {
        return Err(CliError::new(USAGE, "address must not be empty"));
    }

    Ok(SupervisorConfig {
        device,
        connect_timeout: parse_duration("connect timeout", &args.connect_timeout)?,
        keep_alive_interval: parse_duration("keep-alive", &args.keep_alive)?,
        backoff: parse_duration("backoff", &args.backoff)?,
    })
}

fn parse_uuid(name: &str, input: &str) -> CliResult<Uuid> {
    Uuid::parse_str(input.trim())
        .map_err(|err| CliError::new(USAGE, format!("invalid {name} {input}: {err}")))
}

/// Bind the requested text channel and run the bridge on it.
#[cfg_attr(not(feature = "ble"), allow(dead_code))]
pub async fn serve<C>(
    connector: C,
    kind: ChannelKind,
    listen: &str,
    config: SupervisorConfig,
    shutdown: CancellationToken,
) -> CliResult<i32>
where
    C: RadioConnector,
{
    match kind {
        ChannelKind::Ws => {
            let channel = WsChannel::bind(listen)
                .await
                .map_err(|err| channel_error("bind failed", err))?;
            supervise(connector, channel, config, shutdown).await
        }
        ChannelKind::Tcp => {
            let channel = LineChannel::bind(listen)
                .await
                .map_err(|err| channel_error("bind failed", err))?;
            supervise(connector, channel, config, shutdown).await
        }
    }
}

/// Run the supervisor on an already bound channel until `shutdown` fires.
pub async fn supervise<C, T>(
    connector: C,
    channel: T,
    config: SupervisorConfig,
    shutdown: CancellationToken,
) -> CliResult<i32>
where
    C: RadioConnector,
    T: TextChannel,
{
    tracing::info!(
        address = %config.device.address,
        keep_alive = ?config.keep_alive_interval,
        backoff = ?config.backoff,
        "starting bridge"
    );
    let supervisor = Supervisor::new(connector, channel, config).with_shutdown(shutdown);
    let mut states = supervisor.subscribe();
    let reporter = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            tracing::info!(%state, "bridge state");
        }
    });

    supervisor.run().await;
    join_reporter(reporter).await;
    Ok(SUCCESS)
}

async fn join_reporter(reporter: JoinHandle<()>) {
    if let Err(err) = reporter.await {
        tracing::debug!(error = %err, "state reporter ended abnormally");
    }
}

#[cfg_attr(not(feature = "ble"), allow(dead_code))]
fn shutdown_on_interrupt() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, shutting down");
                token.cancel();
            }
            Err(err) => tracing::warn!(error = %err, "interrupt handler unavailable"),
        }
    });
    shutdown
}
