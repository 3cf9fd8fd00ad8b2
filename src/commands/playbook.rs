use super::CommandResult;
use crate::cli::render;
use crate::playbook::PLAYBOOK;

/// playbook: エージェント向け手順書を Markdown として表示する。
pub(super) fn execute() -> CommandResult {
    let mut out = render::markdown(PLAYBOOK);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    CommandResult::success(out)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;

    #[test]
    fn prints_playbook() {
        let fx = Fixture::new();
        let result = fx.run(&["playbook"]);
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.starts_with("# Job application email playbook"));
    }
}
