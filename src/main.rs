fn main() -> anyhow::Result<()> {
    workout_player_lib::run()
}
