//! Connection orchestrator
//!
//! Brings a device from "maybe plugged in over USB" to a running scrcpy
//! session over Wi-Fi:
//!
//! 1. probe the target address
//! 2. switch a wired session to tcpip mode (best effort)
//! 3. connect wirelessly, restarting the adb server once on failure
//! 4. verify the session is `device`, reconnecting once if not
//! 5. run scrcpy
//! 6. disconnect
//!
//! Once the target is known to be reachable, step 6 runs on every exit path,
//! including Ctrl+C.

use super::events::{EventEmitter, RunEvent};
use super::retry::attempt_with_recovery;
use super::state::{RunOutcome, RunState};
use crate::driver::traits::{BridgeTool, MirrorTool, ReachabilityProbe};
use crate::error::ConnectError;
use crate::parser::output::{self, ConnectOutcome, SessionState};
use crate::utils::config::ConnectConfig;
use colored::Colorize;
use std::sync::Mutex;
use tokio::sync::Notify;

pub struct Orchestrator {
    config: ConnectConfig,
    bridge: Box<dyn BridgeTool>,
    probe: Box<dyn ReachabilityProbe>,
    mirror: Box<dyn MirrorTool>,
    events: EventEmitter,
    state: Mutex<RunState>,
}

impl Orchestrator {
    pub fn new(
        config: ConnectConfig,
        bridge: Box<dyn BridgeTool>,
        probe: Box<dyn ReachabilityProbe>,
        mirror: Box<dyn MirrorTool>,
    ) -> Self {
        Self {
            config,
            bridge,
            probe,
            mirror,
            events: EventEmitter::default(),
            state: Mutex::new(RunState::Start),
        }
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, to: RunState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let from = *state;
        if from == to {
            return;
        }
        if !from.can_transition_to(to) {
            log::warn!("Unexpected state transition {} -> {}", from, to);
        }
        *state = to;
        drop(state);

        log::debug!("state {} -> {}", from, to);
        self.events.emit(RunEvent::StateChanged { from, to });
    }

    fn warn(&self, message: String) {
        eprintln!("  {} {}", "⚠️".yellow(), message.yellow());
        self.events.emit(RunEvent::Warning { message });
    }

    /// Run the whole pipeline. `interrupt` is notified on Ctrl+C.
    pub async fn run(&self, interrupt: &Notify) -> RunOutcome {
        let target = self.config.target;

        let reachable = tokio::select! {
            r = self.check_reachability() => r,
            _ = interrupt.notified() => Err(ConnectError::Interrupted),
        };
        if let Err(err) = reachable {
            self.transition(RunState::Aborted);
            return RunOutcome::Aborted(err);
        }
        self.transition(RunState::Reachable);

        let result = tokio::select! {
            r = self.bring_up_and_mirror() => r,
            _ = interrupt.notified() => {
                if self.state() == RunState::Mirroring {
                    eprintln!("\n  {} Mirroring stopped", "⏹️".yellow());
                    Ok(())
                } else {
                    Err(ConnectError::Interrupted)
                }
            }
        };

        let outcome = match result {
            Ok(()) => {
                self.transition(RunState::Done);
                RunOutcome::Completed
            }
            Err(err) => {
                self.transition(RunState::Aborted);
                RunOutcome::Aborted(err)
            }
        };

        self.cleanup().await;
        log::debug!("run for {} finished: {:?}", target, outcome);
        outcome
    }

    async fn bring_up_and_mirror(&self) -> Result<(), ConnectError> {
        if self.release_wired_session().await.is_some() {
            self.transition(RunState::WiredReleased);
        }

        attempt_with_recovery(
            || self.establish_wireless(),
            |err| self.restart_server(err),
        )
        .await?;
        self.transition(RunState::WirelessUp);

        attempt_with_recovery(|| self.verify_ready(), |err| self.reconnect(err)).await?;
        self.transition(RunState::Verified);

        self.transition(RunState::Mirroring);
        self.launch_mirroring().await
    }

    /// Single reachability probe. Fatal on failure.
    pub async fn check_reachability(&self) -> Result<(), ConnectError> {
        let target = self.config.target;
        eprintln!("{} Checking {} is reachable...", "▶".green(), target.host);

        match self.probe.probe(target.host).await {
            Ok(true) => {
                eprintln!("  {} {} is reachable", "✓".green(), target.host);
                Ok(())
            }
            Ok(false) => Err(ConnectError::NetworkUnreachable {
                address: target.host.to_string(),
            }),
            Err(e) => {
                log::warn!("Reachability probe failed to run: {:#}", e);
                Err(ConnectError::NetworkUnreachable {
                    address: target.host.to_string(),
                })
            }
        }
    }

    /// Switch the one wired `device` session (if any) to tcpip mode on the
    /// target port. Returns the serial that was switched.
    pub async fn release_wired_session(&self) -> Option<String> {
        let target = self.config.target;

        let devices = match self.bridge.list_sessions().await {
            Ok(devices) => devices,
            Err(e) => {
                log::warn!("Could not list adb sessions: {:#}", e);
                return None;
            }
        };

        let candidates = output::wired_candidates(&devices);
        let serial = match candidates.as_slice() {
            [] => {
                log::debug!("No wired session to switch to tcpip mode");
                return None;
            }
            [device] => device.serial.clone(),
            many => {
                log::info!(
                    "{} wired devices attached, not switching any to tcpip mode",
                    many.len()
                );
                return None;
            }
        };

        eprintln!(
            "{} Switching USB device {} to tcpip mode on port {}...",
            "▶".green(),
            serial.cyan(),
            target.port
        );
        if let Err(e) = self.bridge.switch_to_network(&serial, target.port).await {
            log::warn!("adb tcpip failed for {}: {:#}", serial, e);
            return None;
        }

        tokio::time::sleep(self.config.settle_delay()).await;
        Some(serial)
    }

    /// Drop any stale session to the target, then connect
    pub async fn establish_wireless(&self) -> Result<(), ConnectError> {
        let target = self.config.target;
        eprintln!("{} Connecting to {}...", "▶".green(), target);

        if let Err(e) = self.bridge.disconnect(&target).await {
            log::debug!("Ignoring disconnect error for {}: {:#}", target, e);
        }

        let text = match self.bridge.connect(&target).await {
            Ok(text) => text,
            Err(e) => format!("{:#}", e),
        };

        match output::classify_connect(&text) {
            ConnectOutcome::Connected => {
                eprintln!("  {} Connected to {}", "✓".green(), target);
                Ok(())
            }
            ConnectOutcome::AlreadyConnected => {
                self.warn(format!("{} was already connected", target));
                Ok(())
            }
            ConnectOutcome::Failed(output) => Err(ConnectError::BridgeConnectFailure {
                address: target.to_string(),
                output,
            }),
        }
    }

    async fn restart_server(&self, err: ConnectError) {
        self.events.emit(RunEvent::Retrying {
            step: "connect".to_string(),
            reason: err.to_string(),
        });
        self.warn(format!("{}; restarting adb server", err));

        if let Err(e) = self.bridge.kill_server().await {
            log::debug!("adb kill-server failed: {:#}", e);
        }
        if let Err(e) = self.bridge.start_server().await {
            log::warn!("adb start-server failed: {:#}", e);
        }
    }

    /// Check the target session reached the `device` state
    pub async fn verify_ready(&self) -> Result<(), ConnectError> {
        let target = self.config.target;
        let address = target.to_string();

        let state = match self.bridge.list_sessions().await {
            Ok(devices) => output::session_state_of(&devices, &target.serial()),
            Err(e) => {
                log::warn!("Could not list adb sessions: {:#}", e);
                SessionState::Absent
            }
        };
        log::debug!("{} state: {}", target, state);

        match state {
            SessionState::Device => {
                eprintln!("  {} {} is ready", "✓".green(), target);
                Ok(())
            }
            SessionState::Offline => Err(ConnectError::StateOffline { address }),
            SessionState::Unauthorized => Err(ConnectError::StateUnauthorized { address }),
            other => Err(ConnectError::StateUnknown {
                address,
                state: other.to_string(),
            }),
        }
    }

    /// Disconnect, wait, connect again
    async fn reconnect(&self, err: ConnectError) {
        let target = self.config.target;
        self.events.emit(RunEvent::Retrying {
            step: "verify".to_string(),
            reason: err.to_string(),
        });
        self.warn(format!("{}; reconnecting", err));

        if let Err(e) = self.bridge.disconnect(&target).await {
            log::debug!("Ignoring disconnect error for {}: {:#}", target, e);
        }
        tokio::time::sleep(self.config.settle_delay()).await;

        match self.bridge.connect(&target).await {
            Ok(text) => log::debug!("reconnect {}: {}", target, text.trim()),
            Err(e) => log::warn!("Reconnect to {} failed: {:#}", target, e),
        }
    }

    /// Run scrcpy until it exits. Fatal on failure, never retried.
    pub async fn launch_mirroring(&self) -> Result<(), ConnectError> {
        let serial = self.config.target.serial();
        eprintln!("{} Starting scrcpy on {}...", "▶".green(), serial.cyan());

        match self.mirror.launch(&serial, &self.config.mirror).await {
            Ok(exit) if exit.success() => {
                eprintln!("  {} scrcpy exited", "✓".green());
                Ok(())
            }
            Ok(exit) => Err(ConnectError::MirroringLaunchFailure {
                detail: match exit.code {
                    Some(code) => format!("scrcpy exited with code {}", code),
                    None => "scrcpy was terminated by a signal".to_string(),
                },
            }),
            Err(e) => Err(ConnectError::MirroringLaunchFailure {
                detail: format!("{:#}", e),
            }),
        }
    }

    /// Tear down the wireless session. Errors are logged only.
    pub async fn cleanup(&self) {
        let target = self.config.target;
        eprintln!("{} Disconnecting {}...", "▶".green(), target);

        let success = match self.bridge.disconnect(&target).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Disconnect from {} failed: {:#}", target, e);
                false
            }
        };
        self.events.emit(RunEvent::CleanupFinished { success });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::traits::MirrorExit;
    use crate::parser::output::Device;
    use crate::utils::config::{MirrorOptions, TargetAddress};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::net::IpAddr;
    use std::sync::Arc;
    use std::time::Duration;

    const TARGET: &str = "192.168.1.100:5555";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        List,
        Connect,
        Disconnect(String),
        SwitchToNetwork(String, u16),
        KillServer,
        StartServer,
        Mirror(String),
    }

    type CallLog = Arc<Mutex<Vec<Call>>>;

    struct FakeBridge {
        calls: CallLog,
        /// Consumed per list call; the last one repeats
        listings: Mutex<VecDeque<Vec<Device>>>,
        /// Consumed per connect call; the last one repeats
        connects: Mutex<VecDeque<String>>,
        hang_on_list: bool,
        fail_disconnect: bool,
        fail_switch: bool,
    }

    impl FakeBridge {
        fn new(calls: CallLog, listings: Vec<Vec<Device>>, connects: Vec<&str>) -> Self {
            Self {
                calls,
                listings: Mutex::new(listings.into()),
                connects: Mutex::new(connects.into_iter().map(String::from).collect()),
                hang_on_list: false,
                fail_disconnect: false,
                fail_switch: false,
            }
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    fn next_scripted<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    #[async_trait]
    impl BridgeTool for FakeBridge {
        async fn list_sessions(&self) -> Result<Vec<Device>> {
            self.record(Call::List);
            if self.hang_on_list {
                std::future::pending::<()>().await;
            }
            Ok(next_scripted(&self.listings).unwrap_or_default())
        }

        async fn connect(&self, _target: &TargetAddress) -> Result<String> {
            self.record(Call::Connect);
            Ok(next_scripted(&self.connects).unwrap_or_default())
        }

        async fn disconnect(&self, target: &TargetAddress) -> Result<()> {
            self.record(Call::Disconnect(target.to_string()));
            if self.fail_disconnect {
                anyhow::bail!("error: no such device '{}'", target);
            }
            Ok(())
        }

        async fn switch_to_network(&self, serial: &str, port: u16) -> Result<()> {
            self.record(Call::SwitchToNetwork(serial.to_string(), port));
            if self.fail_switch {
                anyhow::bail!("error: device '{}' not found", serial);
            }
            Ok(())
        }

        async fn kill_server(&self) -> Result<()> {
            self.record(Call::KillServer);
            Ok(())
        }

        async fn start_server(&self) -> Result<()> {
            self.record(Call::StartServer);
            Ok(())
        }
    }

    struct FakeProbe(bool);

    #[async_trait]
    impl ReachabilityProbe for FakeProbe {
        async fn probe(&self, _host: IpAddr) -> Result<bool> {
            Ok(self.0)
        }
    }

    enum MirrorBehavior {
        Exit(i32),
        NotInstalled,
        RunForever,
    }

    struct FakeMirror {
        calls: CallLog,
        behavior: MirrorBehavior,
    }

    #[async_trait]
    impl MirrorTool for FakeMirror {
        async fn launch(&self, serial: &str, _options: &MirrorOptions) -> Result<MirrorExit> {
            self.calls.lock().unwrap().push(Call::Mirror(serial.to_string()));
            match self.behavior {
                MirrorBehavior::Exit(code) => Ok(MirrorExit { code: Some(code) }),
                MirrorBehavior::NotInstalled => anyhow::bail!("Could not find binary 'scrcpy'"),
                MirrorBehavior::RunForever => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    fn device(serial: &str, state: &str) -> Device {
        Device {
            serial: serial.to_string(),
            state: state.to_string(),
        }
    }

    fn test_config() -> ConnectConfig {
        ConnectConfig {
            target: TARGET.parse().unwrap(),
            settle_delay_ms: 0,
            ..ConnectConfig::default()
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        calls: CallLog,
    }

    fn harness(
        reachable: bool,
        listings: Vec<Vec<Device>>,
        connects: Vec<&str>,
        mirror: MirrorBehavior,
    ) -> Harness {
        harness_with(reachable, FakeBridge::new(Arc::default(), listings, connects), mirror)
    }

    fn harness_with(reachable: bool, bridge: FakeBridge, mirror: MirrorBehavior) -> Harness {
        let calls = bridge.calls.clone();
        let orchestrator = Orchestrator::new(
            test_config(),
            Box::new(bridge),
            Box::new(FakeProbe(reachable)),
            Box::new(FakeMirror {
                calls: calls.clone(),
                behavior: mirror,
            }),
        );
        Harness {
            orchestrator,
            calls,
        }
    }

    impl Harness {
        async fn run(&self) -> RunOutcome {
            self.orchestrator.run(&Notify::new()).await
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, call: &Call) -> usize {
            self.calls().iter().filter(|c| *c == call).count()
        }

        fn mirrored(&self) -> bool {
            self.calls().iter().any(|c| matches!(c, Call::Mirror(_)))
        }

        /// Calls after the mirroring tool returned
        fn calls_after_mirror(&self) -> Vec<Call> {
            let calls = self.calls();
            let idx = calls
                .iter()
                .position(|c| matches!(c, Call::Mirror(_)))
                .expect("mirror was not launched");
            calls[idx + 1..].to_vec()
        }
    }

    fn ready() -> Vec<Vec<Device>> {
        vec![vec![device(TARGET, "device")]]
    }

    fn disconnect_target() -> Call {
        Call::Disconnect(TARGET.to_string())
    }

    #[tokio::test]
    async fn test_unreachable_issues_no_bridge_commands() {
        let h = harness(false, ready(), vec!["connected to x"], MirrorBehavior::Exit(0));
        let outcome = h.run().await;

        assert!(matches!(
            outcome,
            RunOutcome::Aborted(ConnectError::NetworkUnreachable { .. })
        ));
        assert_eq!(outcome.exit_code(), 1);
        assert!(h.calls().is_empty());
        assert_eq!(h.orchestrator.state(), RunState::Aborted);
    }

    #[tokio::test]
    async fn test_full_run_disconnects_once_at_the_end() {
        let h = harness(
            true,
            ready(),
            vec!["connected to 192.168.1.100:5555"],
            MirrorBehavior::Exit(0),
        );
        let outcome = h.run().await;

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(h.calls_after_mirror(), vec![disconnect_target()]);
        assert_eq!(h.calls().last(), Some(&disconnect_target()));
        assert_eq!(h.orchestrator.state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_mirror_failure_still_disconnects() {
        let h = harness(true, ready(), vec!["connected to x"], MirrorBehavior::Exit(2));
        let outcome = h.run().await;

        assert!(matches!(
            outcome.error(),
            Some(ConnectError::MirroringLaunchFailure { .. })
        ));
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(h.calls_after_mirror(), vec![disconnect_target()]);
        assert_eq!(h.count(&Call::Mirror(TARGET.to_string())), 1);
    }

    #[tokio::test]
    async fn test_mirror_not_installed_is_launch_failure() {
        let h = harness(true, ready(), vec!["connected to x"], MirrorBehavior::NotInstalled);
        let outcome = h.run().await;

        match outcome.error() {
            Some(ConnectError::MirroringLaunchFailure { detail }) => {
                assert!(detail.contains("scrcpy"))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.calls().last(), Some(&disconnect_target()));
    }

    #[tokio::test]
    async fn test_already_connected_is_success() {
        let h = harness(
            true,
            ready(),
            vec!["already connected to 192.168.1.100:5555"],
            MirrorBehavior::Exit(0),
        );
        let (events, mut rx) = EventEmitter::new();
        let h = Harness {
            orchestrator: h.orchestrator.with_events(events),
            calls: h.calls,
        };

        assert_eq!(h.run().await, RunOutcome::Completed);
        assert_eq!(h.count(&Call::KillServer), 0);

        let mut warned = false;
        while let Ok(event) = rx.try_recv() {
            if let RunEvent::Warning { message } = event {
                warned |= message.contains("already connected");
            }
        }
        assert!(warned);
    }

    #[tokio::test]
    async fn test_connect_failing_twice_aborts_without_mirroring() {
        let h = harness(
            true,
            ready(),
            vec!["failed to connect to '192.168.1.100:5555': Connection refused"],
            MirrorBehavior::Exit(0),
        );
        let outcome = h.run().await;

        assert!(matches!(
            outcome.error(),
            Some(ConnectError::BridgeConnectFailure { .. })
        ));
        assert_eq!(outcome.exit_code(), 1);
        assert!(!h.mirrored());
        assert_eq!(h.count(&Call::Connect), 2);
        assert_eq!(h.count(&Call::KillServer), 1);
        assert_eq!(h.count(&Call::StartServer), 1);
        assert_eq!(h.calls().last(), Some(&disconnect_target()));
    }

    #[tokio::test]
    async fn test_connect_recovers_after_server_restart() {
        let h = harness(
            true,
            ready(),
            vec!["cannot connect to 192.168.1.100:5555", "connected to 192.168.1.100:5555"],
            MirrorBehavior::Exit(0),
        );
        assert_eq!(h.run().await, RunOutcome::Completed);

        let calls = h.calls();
        let kill = calls.iter().position(|c| *c == Call::KillServer).unwrap();
        let start = calls.iter().position(|c| *c == Call::StartServer).unwrap();
        assert!(kill < start);
    }

    #[tokio::test]
    async fn test_offline_twice_aborts() {
        let h = harness(
            true,
            vec![vec![device(TARGET, "offline")]],
            vec!["connected to x"],
            MirrorBehavior::Exit(0),
        );
        let outcome = h.run().await;

        assert!(matches!(
            outcome.error(),
            Some(ConnectError::StateOffline { .. })
        ));
        assert_eq!(outcome.exit_code(), 1);
        assert!(!h.mirrored());
        // initial connect + one reconnect cycle
        assert_eq!(h.count(&Call::Connect), 2);
    }

    #[tokio::test]
    async fn test_offline_then_ready_proceeds() {
        let h = harness(
            true,
            vec![
                vec![],
                vec![device(TARGET, "offline")],
                vec![device(TARGET, "device")],
            ],
            vec!["connected to x"],
            MirrorBehavior::Exit(0),
        );
        assert_eq!(h.run().await, RunOutcome::Completed);
        assert!(h.mirrored());
    }

    #[tokio::test]
    async fn test_unauthorized_then_absent_reports_second_state() {
        let h = harness(
            true,
            vec![vec![], vec![device(TARGET, "unauthorized")], vec![]],
            vec!["connected to x"],
            MirrorBehavior::Exit(0),
        );
        match h.run().await.error() {
            Some(ConnectError::StateUnknown { state, .. }) => assert_eq!(state, "absent"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wired_device_is_switched_to_tcpip() {
        let h = harness(
            true,
            vec![
                vec![device("R58M12ABCDE", "device")],
                vec![device("R58M12ABCDE", "device"), device(TARGET, "device")],
            ],
            vec!["connected to x"],
            MirrorBehavior::Exit(0),
        );
        let (events, mut rx) = EventEmitter::new();
        let h = Harness {
            orchestrator: h.orchestrator.with_events(events),
            calls: h.calls,
        };
        assert_eq!(h.run().await, RunOutcome::Completed);
        assert_eq!(
            h.count(&Call::SwitchToNetwork("R58M12ABCDE".to_string(), 5555)),
            1
        );

        let mut states = vec![];
        while let Ok(event) = rx.try_recv() {
            if let RunEvent::StateChanged { to, .. } = event {
                states.push(to);
            }
        }
        assert_eq!(
            states,
            vec![
                RunState::Reachable,
                RunState::WiredReleased,
                RunState::WirelessUp,
                RunState::Verified,
                RunState::Mirroring,
                RunState::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_wired_device_not_ready_is_left_alone() {
        let h = harness(
            true,
            vec![
                vec![device("R58M12ABCDE", "unauthorized")],
                vec![device(TARGET, "device")],
            ],
            vec!["connected to x"],
            MirrorBehavior::Exit(0),
        );
        assert_eq!(h.run().await, RunOutcome::Completed);
        assert!(!h
            .calls()
            .iter()
            .any(|c| matches!(c, Call::SwitchToNetwork(..))));
    }

    #[tokio::test]
    async fn test_several_wired_devices_are_left_alone() {
        let h = harness(
            true,
            vec![
                vec![device("A", "device"), device("B", "device")],
                vec![device(TARGET, "device")],
            ],
            vec!["connected to x"],
            MirrorBehavior::Exit(0),
        );
        assert_eq!(h.run().await, RunOutcome::Completed);
        assert!(!h
            .calls()
            .iter()
            .any(|c| matches!(c, Call::SwitchToNetwork(..))));
    }

    #[tokio::test]
    async fn test_interrupt_before_mirroring_aborts_and_cleans_up() {
        let mut bridge = FakeBridge::new(Arc::default(), ready(), vec!["connected to x"]);
        bridge.hang_on_list = true;
        let h = harness_with(true, bridge, MirrorBehavior::Exit(0));

        let interrupt = Arc::new(Notify::new());
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.notify_one();
        });

        let outcome = h.orchestrator.run(&interrupt).await;
        assert_eq!(outcome, RunOutcome::Aborted(ConnectError::Interrupted));
        assert!(!h.mirrored());
        assert_eq!(h.calls().last(), Some(&disconnect_target()));
    }

    #[tokio::test]
    async fn test_interrupt_while_mirroring_completes() {
        let h = harness(true, ready(), vec!["connected to x"], MirrorBehavior::RunForever);

        let interrupt = Arc::new(Notify::new());
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.notify_one();
        });

        let outcome = h.orchestrator.run(&interrupt).await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(h.calls_after_mirror(), vec![disconnect_target()]);
    }

    fn observed(h: Harness) -> (Harness, tokio::sync::broadcast::Receiver<RunEvent>) {
        let (events, rx) = EventEmitter::new();
        let h = Harness {
            orchestrator: h.orchestrator.with_events(events),
            calls: h.calls,
        };
        (h, rx)
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<RunEvent>) -> Vec<RunEvent> {
        let mut events = vec![];
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_usb_device_switched_despite_stale_wireless_session() {
        let h = harness(
            true,
            vec![
                vec![
                    device("R58M12ABCDE", "device"),
                    device("192.168.1.100:41235", "device"),
                    device("adb-R58M12ABCDE-Xy1Z2w._adb-tls-connect._tcp", "device"),
                ],
                vec![device(TARGET, "device")],
            ],
            vec!["connected to x"],
            MirrorBehavior::Exit(0),
        );
        assert_eq!(h.run().await, RunOutcome::Completed);
        assert_eq!(
            h.count(&Call::SwitchToNetwork("R58M12ABCDE".to_string(), 5555)),
            1
        );
        assert!(!h
            .calls()
            .iter()
            .any(|c| matches!(c, Call::SwitchToNetwork(serial, _) if serial != "R58M12ABCDE")));
    }

    #[tokio::test]
    async fn test_failed_tcpip_switch_does_not_abort() {
        let mut bridge = FakeBridge::new(
            Arc::default(),
            vec![
                vec![device("R58M12ABCDE", "device")],
                vec![device(TARGET, "device")],
            ],
            vec!["connected to x"],
        );
        bridge.fail_switch = true;
        let (h, mut rx) = observed(harness_with(true, bridge, MirrorBehavior::Exit(0)));

        let outcome = h.run().await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(
            h.count(&Call::SwitchToNetwork("R58M12ABCDE".to_string(), 5555)),
            1
        );
        assert!(h.mirrored());
        assert!(!drain(&mut rx).iter().any(|e| matches!(
            e,
            RunEvent::StateChanged {
                to: RunState::WiredReleased,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_failed_disconnects_keep_successful_exit_code() {
        let mut bridge = FakeBridge::new(Arc::default(), ready(), vec!["connected to x"]);
        bridge.fail_disconnect = true;
        let (h, mut rx) = observed(harness_with(true, bridge, MirrorBehavior::Exit(0)));

        let outcome = h.run().await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(outcome.exit_code(), 0);

        // stale teardown failed but connect was still issued
        let calls = h.calls();
        let first_disconnect = calls.iter().position(|c| *c == disconnect_target()).unwrap();
        assert_eq!(calls[first_disconnect + 1], Call::Connect);
        assert_eq!(h.count(&Call::Connect), 1);

        assert_eq!(h.calls_after_mirror(), vec![disconnect_target()]);
        assert!(drain(&mut rx).contains(&RunEvent::CleanupFinished { success: false }));
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_abort_exit_code() {
        let mut bridge = FakeBridge::new(Arc::default(), ready(), vec!["connected to x"]);
        bridge.fail_disconnect = true;
        let (h, mut rx) = observed(harness_with(true, bridge, MirrorBehavior::Exit(2)));

        let outcome = h.run().await;
        assert!(matches!(
            outcome.error(),
            Some(ConnectError::MirroringLaunchFailure { .. })
        ));
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(h.calls_after_mirror(), vec![disconnect_target()]);
        assert!(drain(&mut rx).contains(&RunEvent::CleanupFinished { success: false }));
    }
}
