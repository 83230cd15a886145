fn main() -> std::process::ExitCode {
  mtgsearch_lib::run()
}
