use tcgen_core::export::write_template;

use crate::cli::args::TemplateArgs;
use crate::exit_codes;

pub fn run(args: TemplateArgs) -> anyhow::Result<i32> {
    if let Err(e) = write_template(&args.out) {
        eprintln!("error: {e}");
        return Ok(exit_codes::EXPORT_ERROR);
    }
    eprintln!("템플릿이 생성되었습니다: {}", args.out.display());
    Ok(exit_codes::SUCCESS)
}
