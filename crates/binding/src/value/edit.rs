//! Modifications to the values of a module.
//!
//! These are only available through a [`ModuleMut`], which can only be made
//! from an exclusive borrow of the module, so a read-only
//! [`crate::module::ModuleRef`] can never be used to change the IR.

use inkwell::attributes::{Attribute, AttributeLoc};
use irlens_errors::binding::{Error, Result};
use tracing::debug;

use crate::{
    attribute::{kind_for_name, names},
    module::ModuleMut,
    value::{
        kind::{Linkage, StorageClass, Visibility},
        ValueRef,
    },
};

impl<'m> ModuleMut<'m> {
    /// Requires that `value` belongs to this module.
    fn require_owned(&self, value: &ValueRef<'m>) -> Result<()> {
        if self.owns(value) {
            Ok(())
        } else {
            Err(Error::unexpected_value(
                "value from the module being modified",
                format!("{value:?}"),
            ))
        }
    }

    /// Renames `value`. LLVM may adjust the name to keep it unique within its
    /// symbol table.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if `value` is not from this module, or
    ///   cannot carry a name.
    pub fn set_name(&self, value: &ValueRef<'m>, name: &str) -> Result<()> {
        self.require_owned(value)?;
        value.handle().set_name(name)?;
        debug!(name, "renamed value");
        Ok(())
    }

    /// Sets the linkage of the global value `value`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if `value` is not a global value from this
    ///   module.
    pub fn set_linkage(&self, value: &ValueRef<'m>, linkage: Linkage) -> Result<()> {
        self.require_owned(value)?;
        value.require_global_value()?.set_linkage(linkage.into());
        Ok(())
    }

    /// Sets the visibility of the global value `value`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if `value` is not a global value from this
    ///   module.
    pub fn set_visibility(&self, value: &ValueRef<'m>, visibility: Visibility) -> Result<()> {
        self.require_owned(value)?;
        value.require_global_value()?.set_visibility(visibility.into());
        Ok(())
    }

    /// Sets the DLL storage class of the global value `value`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if `value` is not a global value from this
    ///   module.
    pub fn set_storage_class(&self, value: &ValueRef<'m>, class: StorageClass) -> Result<()> {
        self.require_owned(value)?;
        value.require_global_value()?.set_dll_storage_class(class.into());
        Ok(())
    }

    /// Adds the enum attribute called `name` to `function`.
    ///
    /// Only attributes without a payload can be added this way. Attributes
    /// that carry an integer or a type, such as `align` or `byval`, are
    /// rejected rather than added with an empty payload.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if `function` is not a function from this
    ///   module, or `name` is an attribute that carries a payload.
    /// - [`Error::UnknownAttribute`] if LLVM does not know an enum attribute
    ///   called `name`.
    pub fn add_function_attribute(&self, function: &ValueRef<'m>, name: &str) -> Result<()> {
        self.require_owned(function)?;
        let target = function.require_function()?;
        if names::INT_ATTRIBUTE_NAMES.contains(&name) || names::TYPE_ATTRIBUTE_NAMES.contains(&name) {
            Err(Error::unexpected_value("attribute without a payload", name))?;
        }
        let kind = kind_for_name(name).ok_or_else(|| Error::UnknownAttribute(name.to_string()))?;

        let attribute = target.get_type().get_context().create_enum_attribute(kind, 0);
        target.add_attribute(AttributeLoc::Function, attribute);
        debug!(attribute = name, "added function attribute");
        Ok(())
    }

    /// Adds the string attribute `key`=`value` to `function`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedValue`] if `function` is not a function from this
    ///   module.
    pub fn add_function_key_value_attribute(
        &self,
        function: &ValueRef<'m>,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.require_owned(function)?;
        let target = function.require_function()?;
        let attribute: Attribute = target.get_type().get_context().create_string_attribute(key, value);
        target.add_attribute(AttributeLoc::Function, attribute);
        debug!(key, value, "added function key-value attribute");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use irlens_errors::binding::Error;

    use crate::{
        context::SourceContext,
        test_utils::with_structure_module_mut,
        value::kind::{Linkage, StorageClass, Visibility},
    };

    #[test]
    fn modifies_global_properties() -> anyhow::Result<()> {
        with_structure_module_mut(|module| {
            let counter = module.get_global_variable("counter").expect("counter exists");
            module.set_linkage(&counter, Linkage::Internal)?;
            module.set_visibility(&counter, Visibility::Default)?;
            assert_eq!(counter.linkage()?, Linkage::Internal);

            let hidden = module.get_global_variable("hidden").expect("hidden exists");
            module.set_visibility(&hidden, Visibility::Protected)?;
            assert_eq!(hidden.visibility()?, Visibility::Protected);

            let sum = module.get_function("sum").expect("sum exists");
            module.set_storage_class(&sum, StorageClass::DllExport)?;
            assert_eq!(sum.storage_class()?, StorageClass::DllExport);

            module.set_name(&counter, "renamed")?;
            assert_eq!(counter.name()?, "renamed");
            assert!(module.get_global_variable("renamed").is_some());

            let entry = sum.blocks()?.next().expect("sum has blocks");
            assert!(matches!(
                module.set_linkage(&entry, Linkage::Private),
                Err(Error::UnexpectedValue { .. })
            ));
            Ok(())
        })
    }

    #[test]
    fn adds_function_attributes() -> anyhow::Result<()> {
        with_structure_module_mut(|module| {
            let sum = module.get_function("sum").expect("sum exists");
            module.add_function_attribute(&sum, "cold")?;
            module.add_function_key_value_attribute(&sum, "target-cpu", "generic")?;

            let rendered = sum
                .attributes()?
                .into_flat()
                .map(|attr| attr.to_string())
                .collect::<Vec<_>>();
            assert!(rendered.contains(&"cold".to_string()));
            assert!(rendered.contains(&"\"target-cpu\"=\"generic\"".to_string()));

            assert!(matches!(
                module.add_function_attribute(&sum, "definitely-not-an-attribute"),
                Err(Error::UnknownAttribute(_))
            ));

            let counter = module.get_global_variable("counter").expect("counter exists");
            assert!(matches!(
                module.add_function_attribute(&counter, "cold"),
                Err(Error::UnexpectedValue { .. })
            ));
            Ok(())
        })
    }

    #[test]
    fn rejects_attributes_with_payloads() -> anyhow::Result<()> {
        with_structure_module_mut(|module| {
            let sum = module.get_function("sum").expect("sum exists");
            for name in ["byval", "sret", "align", "memory"] {
                assert!(matches!(
                    module.add_function_attribute(&sum, name),
                    Err(Error::UnexpectedValue { .. })
                ));
            }
            assert!(sum.attributes()?.into_flat().next().is_none());
            Ok(())
        })
    }

    #[test]
    fn modifies_each_module_in_turn() -> anyhow::Result<()> {
        let mut ctx = SourceContext::create();
        ctx.add_module(("first.ll", "define void @first() {\n  ret void\n}\n"))?;
        ctx.add_module(("second.ll", "define void @second() {\n  ret void\n}\n"))?;

        let accepted = ctx.modify_modules(|module| {
            let own = module.functions().next().expect("each module has a function");
            module.set_name(&own, "renamed")?;
            Ok(module.get_function("renamed").is_some())
        })?;
        assert_eq!(accepted, [true, true]);
        Ok(())
    }
}
