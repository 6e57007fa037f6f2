//! Renders a module as an indented, human-readable outline.

use irlens_binding::{attribute::Attributes, ConstantOptions, ModuleRef, ValueRef};
use irlens_errors::binding::Result;
use itertools::Itertools;
use tracing::warn;

/// What to include in the outline.
#[derive(Clone, Debug, Default)]
pub struct ReportOptions {
    /// Restricts the outline to the function with this name.
    pub function: Option<String>,

    /// How to read the values of global variables.
    pub constants: ConstantOptions,

    /// Whether to include attributes.
    pub attributes: bool,
}

/// Describes `module` as a list of output lines.
pub fn describe_module(module: ModuleRef<'_>, options: &ReportOptions) -> Result<Vec<String>> {
    let mut lines = vec![format!("module {}", module.name()?)];

    if options.function.is_none() {
        for global in module.global_variables() {
            lines.push(describe_global(&global, options)?);
        }
    }

    let functions = match &options.function {
        Some(name) => {
            let function = module.get_function(name);
            if function.is_none() {
                warn!(function = name, "no such function in module");
            }
            function.into_iter().collect::<Vec<_>>()
        }
        None => module.functions().collect(),
    };

    for function in functions {
        describe_function(&function, options, &mut lines)?;
    }

    Ok(lines)
}

fn describe_global(global: &ValueRef<'_>, options: &ReportOptions) -> Result<String> {
    let header = format!(
        "global @{}: {} {}",
        global.name()?,
        global.linkage()?,
        global.visibility()?
    );
    if !global.has_initializer()? {
        return Ok(format!("{header} (declared)"));
    }
    let value = match global.get_constant_value(options.constants) {
        Ok(value) => value.to_string(),
        Err(err) => format!("<{err}>"),
    };
    Ok(format!("{header} = {value}"))
}

fn describe_function(function: &ValueRef<'_>, options: &ReportOptions, lines: &mut Vec<String>) -> Result<()> {
    let kind = if function.is_declaration()? { "declare" } else { "define" };
    let args = function.arguments()?.map(|arg| format!("{arg:?}")).join(", ");
    lines.push(format!(
        "{kind} @{}({args}): {} {} {}",
        function.name()?,
        function.linkage()?,
        function.visibility()?,
        function.storage_class()?,
    ));
    if options.attributes {
        describe_attributes(function.attributes()?, "  ", lines);
    }

    for block in function.blocks()? {
        lines.push(format!("  {}:", block.name()?));
        for inst in block.instructions()? {
            lines.push(format!("    {}", inst.to_string().trim()));
            let operands = inst.operands()?.map(|op| format!("{op:?}")).join(", ");
            lines.push(format!("      {}, operands=[{operands}]", inst.opcode()?));
            if options.attributes {
                describe_attributes(inst.attributes()?, "      ", lines);
            }
        }
    }

    Ok(())
}

fn describe_attributes(attributes: Attributes<'_>, indent: &str, lines: &mut Vec<String>) {
    match attributes {
        Attributes::List(list) => {
            for mut set in list {
                let position = set.index().map(|i| i.to_string()).unwrap_or_default();
                lines.push(format!("{indent}attributes({position}): {}", set.join(" ")));
            }
        }
        Attributes::Set(mut set) => lines.push(format!("{indent}attributes: {}", set.join(" "))),
        Attributes::Empty => (),
    }
}

#[cfg(test)]
mod test {
    use irlens_binding::{ConstantOptions, SourceContext};

    use crate::report::{describe_module, ReportOptions};

    const MODULE: &str = r#"
@limit = global i8 -1
@name = constant [3 x i8] c"ok\00"

define i8 @clamp(i8 %x) #0 {
entry:
  %small = icmp ult i8 %x, 10
  %r = select i1 %small, i8 %x, i8 10
  ret i8 %r
}

attributes #0 = { nounwind }
"#;

    fn describe(options: &ReportOptions) -> anyhow::Result<Vec<String>> {
        let mut ctx = SourceContext::create();
        ctx.add_module(("clamp.ll", MODULE))?;
        let mut reports = ctx.analyze_modules(|module| describe_module(module, options))?;
        Ok(reports.remove(0))
    }

    #[test]
    fn outlines_whole_module() -> anyhow::Result<()> {
        let lines = describe(&ReportOptions::default())?;

        assert_eq!(lines[0], "module clamp.ll");
        assert_eq!(lines[1], "global @limit: external default = 255");
        assert_eq!(lines[2], "global @name: external default = b\"ok\\x00\"");
        assert_eq!(lines[3], "define @clamp(ValueRef(%x)): external default default");
        assert_eq!(lines[4], "  entry:");
        assert_eq!(lines[5], "    %small = icmp ult i8 %x, 10");
        assert_eq!(lines[6], "      icmp, operands=[ValueRef(%x), ValueRef(i8 10)]");
        assert_eq!(lines.len(), 11);
        Ok(())
    }

    #[test]
    fn reads_globals_as_signed() -> anyhow::Result<()> {
        let options = ReportOptions {
            constants: ConstantOptions::new().with_signed_int(true),
            ..ReportOptions::default()
        };
        let lines = describe(&options)?;
        assert_eq!(lines[1], "global @limit: external default = -1");
        Ok(())
    }

    #[test]
    fn filters_functions_and_prints_attributes() -> anyhow::Result<()> {
        let options = ReportOptions {
            function:   Some("clamp".to_string()),
            constants:  ConstantOptions::new(),
            attributes: true,
        };
        let lines = describe(&options)?;

        assert_eq!(lines[1], "define @clamp(ValueRef(%x)): external default default");
        assert_eq!(lines[2], "  attributes(function): nounwind");
        assert!(lines.iter().all(|line| !line.starts_with("global")));

        let missing = ReportOptions {
            function: Some("missing".to_string()),
            ..ReportOptions::default()
        };
        assert_eq!(describe(&missing)?, ["module clamp.ll"]);
        Ok(())
    }
}
