use std::process::Stdio;

use tokio::process::Command;

/// Which transcoder the pipeline actually drives for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Cpu,
    Nvidia,
}

impl EngineKind {
    pub fn label(self) -> &'static str {
        match self {
            EngineKind::Cpu => "cpu",
            EngineKind::Nvidia => "nvidia",
        }
    }
}

/// Probes for an NVIDIA encoder by shelling out to `nvidia-smi`, the way the
/// original bot's `detect_gpu` does at startup. A missing binary or a
/// non-zero exit is treated as "no hardware", never as an error: hardware
/// acceleration is always an optional optimization.
pub async fn detect_engine(hardware_accel_enabled: bool) -> EngineKind {
    if !hardware_accel_enabled {
        return EngineKind::Cpu;
    }
    let status = Command::new("nvidia-smi")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => EngineKind::Nvidia,
        _ => EngineKind::Cpu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_flag_short_circuits_to_cpu() {
        assert_eq!(detect_engine(false).await, EngineKind::Cpu);
    }
}
