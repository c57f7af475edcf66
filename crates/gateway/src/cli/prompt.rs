/// `quotagate prompt`: print the assembled system prompt.
pub fn print(model: Option<&str>, minimal: bool) {
    print!("{}", qg_prompts::build_system_prompt(model, minimal));
}
