fn main() {
    std::process::exit(calendar_board_lib::run());
}
