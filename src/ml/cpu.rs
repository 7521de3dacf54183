/// Number of physical CPU cores, used as the default worker count.
///
/// Falls back to the available parallelism reported by the OS, then to 1.
pub fn physical_cpu_count() -> usize {
    sysinfo::System::physical_core_count()
        .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(1)
        .max(1)
}
