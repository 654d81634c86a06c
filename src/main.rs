fn main() -> std::process::ExitCode {
    armaguard_settings_lib::run()
}
