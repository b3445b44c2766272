//! Synthesized definitions of the builtin classes.
//!
//! The builtin surface visible to MiniJava programs is the global `System`
//! of type `java.lang.System`, whose field `out` of type
//! `java.io.PrintStream` offers `println(int)`, and the `String` type used
//! by `main`'s parameter. These classes have no source text; their AST is
//! synthesized here with the same factory as the user program, so node IDs
//! stay unique across both trees.

use mjc_frontend::{
    AstFactory, BasicTypeName, Block, ClassDeclaration, InstanceMethod, NodeInfo, Position,
    Program, Type, VarDecl,
};
use mjc_symbol::predefined;

/// The synthesized builtin AST and the implicit globals.
pub struct BuiltinDefinitions {
    /// Classes `String`, `java.io.PrintStream`, `java.lang.System`.
    pub ast: Program,
    /// Declarations of implicit globals, i.e. `System`.
    pub globals: Vec<VarDecl>,
}

impl BuiltinDefinitions {
    pub fn class_string(&self) -> &ClassDeclaration {
        &self.ast.classes[0]
    }

    pub fn class_print_stream(&self) -> &ClassDeclaration {
        &self.ast.classes[1]
    }

    pub fn class_system(&self) -> &ClassDeclaration {
        &self.ast.classes[2]
    }

    /// The `println` method of `java.io.PrintStream`.
    pub fn println(&self) -> &InstanceMethod {
        &self.class_print_stream().instance_methods[0]
    }
}

fn info(factory: &mut AstFactory) -> NodeInfo {
    factory.make(Position::UNKNOWN)
}

/// Builds the builtin class AST and the `System` global.
pub fn create_builtins(factory: &mut AstFactory) -> BuiltinDefinitions {
    let string_class = ClassDeclaration {
        info: info(factory),
        name: predefined::STRING,
        fields: Vec::new(),
        instance_methods: Vec::new(),
        main_methods: Vec::new(),
    };

    // public void println(int arg) { }
    let println = InstanceMethod {
        info: info(factory),
        return_type: Type { info: info(factory), name: BasicTypeName::Void, rank: 0 },
        name: predefined::PRINTLN,
        parameters: vec![VarDecl {
            info: info(factory),
            var_type: Type { info: info(factory), name: BasicTypeName::Int, rank: 0 },
            name: predefined::ARG,
        }],
        body: Block { info: info(factory), statements: Vec::new() },
    };
    let print_stream_class = ClassDeclaration {
        info: info(factory),
        name: predefined::JAVA_IO_PRINT_STREAM,
        fields: Vec::new(),
        instance_methods: vec![println],
        main_methods: Vec::new(),
    };

    // public java.io.PrintStream out;
    let out_field = VarDecl {
        info: info(factory),
        var_type: Type {
            info: info(factory),
            name: BasicTypeName::Class(predefined::JAVA_IO_PRINT_STREAM),
            rank: 0,
        },
        name: predefined::OUT,
    };
    let system_class = ClassDeclaration {
        info: info(factory),
        name: predefined::JAVA_LANG_SYSTEM,
        fields: vec![out_field],
        instance_methods: Vec::new(),
        main_methods: Vec::new(),
    };

    let ast = Program {
        info: info(factory),
        classes: vec![string_class, print_stream_class, system_class],
    };

    // the implicit global `System`
    let globals = vec![VarDecl {
        info: info(factory),
        var_type: Type {
            info: info(factory),
            name: BasicTypeName::Class(predefined::JAVA_LANG_SYSTEM),
            rank: 0,
        },
        name: predefined::SYSTEM,
    }];

    BuiltinDefinitions { ast, globals }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shape() {
        let mut factory = AstFactory::default();
        let builtins = create_builtins(&mut factory);
        assert_eq!(builtins.ast.classes.len(), 3);
        assert_eq!(builtins.class_string().name, predefined::STRING);
        assert_eq!(builtins.println().parameters.len(), 1);
        assert_eq!(builtins.globals.len(), 1);
        assert_eq!(builtins.globals[0].name, predefined::SYSTEM);
    }

    #[test]
    fn builtin_ids_continue_the_factory_sequence() {
        let mut factory = AstFactory::new(100);
        let builtins = create_builtins(&mut factory);
        assert!(builtins.ast.classes.iter().all(|c| c.info.id > 100));
        assert_eq!(factory.id(), 100 + 13);
    }
}
