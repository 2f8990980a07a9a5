fn main() {
  library_lib::run()
}
