//! Real-time setup for the measurement loop (Linux: SCHED_FIFO, affinity, mlockall).
//!
//! Every step is best effort: a failure is logged and the monitor still runs,
//! just with more window jitter.

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
const MAX_CPUSET_BITS: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

#[cfg(target_os = "linux")]
fn os_error(what: &str) -> eyre::Report {
    eyre::eyre!("{what}: {}", std::io::Error::last_os_error())
}

#[cfg(target_os = "linux")]
fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};
    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    // SAFETY: mlockall takes plain flags and touches no Rust-owned memory.
    if unsafe { mlockall(flags) } == 0 {
        return Ok(());
    }
    let err = os_error("mlockall");
    if lock == RtLock::All && unsafe { mlockall(MCL_CURRENT) } == 0 {
        tracing::warn!(error = %err, "mlockall(current|future) failed; locked current pages only");
        return Ok(());
    }
    Err(err.wrap_err("hint: needs CAP_IPC_LOCK (or root) and a large enough 'ulimit -l'"))
}

#[cfg(target_os = "linux")]
fn fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};
    // SAFETY: pure queries on a valid policy constant.
    let (min, max) = unsafe {
        (
            sched_get_priority_min(SCHED_FIFO),
            sched_get_priority_max(SCHED_FIFO),
        )
    };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let value = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: value,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling process.
    if unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) } != 0 {
        return Err(os_error("sched_setscheduler(SCHED_FIFO)")
            .wrap_err("hint: run as root or grant CAP_SYS_NICE"));
    }
    Ok(value)
}

#[cfg(target_os = "linux")]
fn pin_cpu(cpu: usize) -> eyre::Result<()> {
    use libc::{CPU_ISSET, CPU_SET, CPU_ZERO, cpu_set_t};
    if cpu >= MAX_CPUSET_BITS {
        eyre::bail!("requested CPU {cpu} exceeds cpu_set_t capacity {MAX_CPUSET_BITS}");
    }
    // SAFETY: cpu_set_t is plain data; all pointers are to locals.
    unsafe {
        let mut allowed: cpu_set_t = std::mem::zeroed();
        CPU_ZERO(&mut allowed);
        if libc::sched_getaffinity(0, std::mem::size_of::<cpu_set_t>(), &mut allowed) != 0 {
            return Err(os_error("sched_getaffinity"));
        }
        if !CPU_ISSET(cpu, &allowed) {
            eyre::bail!("CPU {cpu} not permitted by current affinity mask");
        }
        let mut wanted: cpu_set_t = std::mem::zeroed();
        CPU_ZERO(&mut wanted);
        CPU_SET(cpu, &mut wanted);
        if libc::sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &wanted) != 0 {
            return Err(os_error("sched_setaffinity"));
        }
    }
    Ok(())
}

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock, rt_cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        match lock_memory(lock) {
            Ok(()) => tracing::info!(?lock, "rt memory lock applied"),
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "rt memory lock failed"),
        }
        match fifo_priority(prio) {
            Ok(p) => tracing::info!(priority = p, "rt SCHED_FIFO applied"),
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "rt SCHED_FIFO failed"),
        }
        let cpu = rt_cpu.unwrap_or(0);
        match pin_cpu(cpu) {
            Ok(()) => tracing::info!(cpu, "rt affinity applied"),
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "rt affinity not applied"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(rt: bool, _prio: Option<i32>, _lock: RtLock, _rt_cpu: Option<usize>) {
    if rt {
        tracing::warn!("real-time mode is only supported on Linux; ignoring --rt");
    }
}
