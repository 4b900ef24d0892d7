use {std::sync::OnceLock, sysinfo::System};

static CPU_COUNT: OnceLock<usize> = OnceLock::new();

/// Logical cores, at least one.
pub fn get_cpu_count() -> usize {
    *CPU_COUNT.get_or_init(|| {
        let mut system = System::new();
        system.refresh_cpu_all();
        system.cpus().len().max(1)
    })
}
