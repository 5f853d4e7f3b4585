pub mod rust_log {
    use std::panic::Location;

    /// Emit a single access line through the global `log` logger.
    ///
    /// `loc` is the call site reported as the record's file and line, if any.
    pub fn log(
        level: log::Level,
        target: &str,
        module_path: &'static str,
        loc: Option<&'static Location<'static>>,
        line: &str,
    ) {
        log::logger().log(
            &log::Record::builder()
                .args(format_args!("{line}"))
                .level(level)
                .target(target)
                .module_path_static(Some(module_path))
                .file_static(loc.map(Location::file))
                .line(loc.map(Location::line))
                .build(),
        );
    }
}
