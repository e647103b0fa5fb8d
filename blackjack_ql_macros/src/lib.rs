use proc_macro::TokenStream as TokenStream1;
use quote::ToTokens;
use syn;

/// This macro is added before a method of the `Game` struct in the impl block.
/// Use this macro to first check if the current round phase is one of the
/// phases in the attribute.
///
/// For example, `#[allowed_phase(PlayerActing)]` will make a method first
/// check if the current phase is `PlayerActing`. If not, the method will
/// return `crate::Error::WrongPhase`. Several phases may be given, separated
/// by commas: `#[allowed_phase(Dealing, PlayerActing)]`.
#[proc_macro_attribute]
pub fn allowed_phase(attr: TokenStream1, item: TokenStream1) -> TokenStream1 {
    let mut ast: syn::ImplItemFn = syn::parse(item).unwrap();
    let phases: Vec<String> = attr
        .to_string()
        .split(',')
        .map(|phase| phase.trim().to_string())
        .filter(|phase| !phase.is_empty())
        .collect();
    if phases.is_empty() {
        panic!("allowed_phase requires at least one phase");
    }
    let function_name = ast.sig.ident.to_string();

    let condition = phases
        .iter()
        .map(|phase| format!("self.phase == RoundPhase::{}", phase))
        .collect::<Vec<String>>()
        .join(" || ");
    let expected = phases.join(" or ");
    let code = format!(
        r#"
    if !({}) {{
        return Err(crate::Error::WrongPhase {{
            method: "{}",
            expected: "{}",
            found: self.phase,
        }});
    }}
"#,
        condition, function_name, expected
    );
    let early_return: TokenStream1 = code.parse().unwrap();
    let early_return: syn::Stmt = syn::parse(early_return).unwrap();
    ast.block.stmts.insert(0, early_return);
    ast.into_token_stream().into()
}
