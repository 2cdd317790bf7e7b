/// Container-aware CPU limit detection for sizing the tokio worker pool.
///
/// The scanner fan-out is I/O bound, but tokio still defaults its thread
/// count to the host CPU count, which over-provisions when the daemon runs in a
/// container limited to a slice of a large machine. Detection order: the
/// `SCOUT_CPU_LIMIT` env var ("2" or "2000m"), cgroup v2 `cpu.max`, cgroup
/// v1 quota/period, then host parallelism.
pub fn worker_threads() -> usize {
    if let Some(cores) = std::env::var("SCOUT_CPU_LIMIT")
        .ok()
        .and_then(|v| parse_cpu_value(&v))
    {
        return cores.max(1);
    }

    if let Some(cores) =
        std::fs::read_to_string("/sys/fs/cgroup/cpu.max")
            .ok()
            .and_then(|max| {
                let mut parts = max.split_whitespace();
                quota_over_period(parts.next()?, parts.next()?)
            })
    {
        return cores.max(1);
    }

    if let (Ok(quota), Ok(period)) = (
        std::fs::read_to_string("/sys/fs/cgroup/cpu/cpu.cfs_quota_us"),
        std::fs::read_to_string("/sys/fs/cgroup/cpu/cpu.cfs_period_us"),
    ) {
        if let Some(cores) = quota_over_period(quota.trim(), period.trim()) {
            return cores.max(1);
        }
    }

    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

/// "2" (cores) or "2000m" (millicores).
fn parse_cpu_value(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_suffix('m') {
        Some(millis) => millis.parse::<usize>().ok().map(|m| m / 1000),
        None => value.parse::<usize>().ok(),
    }
}

fn quota_over_period(quota: &str, period: &str) -> Option<usize> {
    if quota == "max" {
        return None; // unlimited
    }
    let quota: i64 = quota.parse().ok()?;
    let period: i64 = period.parse().ok()?;
    if quota > 0 && period > 0 {
        Some((quota / period) as usize)
    } else {
        None
    }
}
