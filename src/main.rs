fn main() {
    workfocus_lib::run()
}
