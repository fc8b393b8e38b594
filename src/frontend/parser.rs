use crate::frontend::parser_error::{ParseErrorKind, ParserError};
use crate::frontend::token::{Span, Token, TokenKind};
use crate::lang::node::{Builtin, Function, Logic, Node, Operator};
use crate::lang::symbols::{MAIN_FUNCTION, NameError, SymbolTable, VarRef};

type RuleResult = Result<Option<Node>, ParserError>;

const TYPE_KEYWORDS: &[&str] = &["var", "int", "float"];

const OR_LEVEL: &[Operator] = &[Operator::Or];
const AND_LEVEL: &[Operator] = &[Operator::And];
const COMPARE_LEVEL: &[Operator] = &[
    Operator::Equal,
    Operator::NotEqual,
    Operator::Lower,
    Operator::Greater,
    Operator::NotGreater,
    Operator::NotLower,
];
const SUM_LEVEL: &[Operator] = &[Operator::Plus, Operator::Minus];
const TERM_LEVEL: &[Operator] = &[Operator::Multiply, Operator::Divide];

/// Recursive-descent parser for `.lk` programs.
///
/// The parser consumes lexer tokens and produces a `Node::Root`, resolving
/// every variable and function name against its [`SymbolTable`] as it goes.
///
/// Notes:
/// - Every rule returns `Ok(None)` when it does not apply at the current
///   position. Only a rule that has committed (consumed its leading token)
///   and then fails returns `Err`.
/// - Function headers are collected in a pre-pass so calls may refer to
///   functions defined further down the file.
/// - Variable declarations do not produce statements. Their initializers are
///   hoisted into the `VarInitBlock` of the enclosing scope.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Span of the most recently consumed token.
    ///
    /// Used to provide stable source locations for errors at end of input.
    last_span: Option<Span>,
    symbols: SymbolTable,
    /// Hoisted initializers of the scope being parsed.
    init: Vec<Node>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            last_span: None,
            symbols: SymbolTable::new(),
            init: Vec::new(),
        }
    }

    /// Returns the current token without consuming it.
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Advances the token stream by one and returns the consumed token.
    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if let Some(t) = token {
            self.last_span = Some(t.span);
        }
        self.pos += 1;
        token
    }

    fn check(&self, kind: TokenKind, text: &str) -> bool {
        self.current().is_some_and(|t| t.is(kind, text))
    }

    /// Consumes the current token if it matches.
    fn eat(&mut self, kind: TokenKind, text: &str) -> bool {
        if self.check(kind, text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, text: &str) -> Result<(), ParserError> {
        if self.eat(kind, text) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}', found {}", text, self.describe_current())))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span), ParserError> {
        match self.current() {
            Some(t) if t.kind == TokenKind::Identifier => {
                let found = (t.text.clone(), t.span);
                self.advance();
                Ok(found)
            }
            _ => Err(self.error(&format!("expected {}, found {}", what, self.describe_current()))),
        }
    }

    fn describe_current(&self) -> String {
        match self.current() {
            Some(t) => format!("'{}'", t.text),
            None => "end of input".to_string(),
        }
    }

    fn current_span(&self) -> Span {
        self.current()
            .map(|t| t.span)
            .or(self.last_span)
            .unwrap_or(Span { line: 1, col: 1 })
    }

    /// Constructs a syntax error at the most relevant location.
    ///
    /// Priority: the current token, then the last consumed token, then 1:1
    /// for empty input.
    fn error(&self, message: &str) -> ParserError {
        let span = self.current_span();
        ParserError {
            kind: ParseErrorKind::Syntax,
            message: message.to_string(),
            line: span.line,
            col: span.col,
        }
    }

    fn name_error(&self, err: NameError, span: Span) -> ParserError {
        ParserError::from_name(err, span.line, span.col)
    }

    /// Parses a complete program.
    ///
    /// ```text
    /// program := { global_decl | function } main_fn { global_decl | function }
    /// ```
    ///
    /// # Errors
    /// - Syntax errors anywhere in the file.
    /// - A missing `main`, or a second one.
    /// - Name resolution failures.
    pub fn parse(&mut self) -> Result<Node, ParserError> {
        self.declare_functions()?;

        let mut functions = Vec::new();
        let mut main = None;

        while let Some(tok) = self.current() {
            if tok.is_keyword("func") {
                functions.push(self.parse_function()?);
            } else if tok.is_keyword("main") {
                if main.is_some() {
                    let span = self.current_span();
                    return Err(self.name_error(
                        NameError::Redeclaration {
                            name: MAIN_FUNCTION.to_string(),
                            scope: "function table",
                        },
                        span,
                    ));
                }
                main = Some(self.parse_main()?);
            } else if let Some(init) = self.parse_declaration()? {
                self.init.push(init);
            } else {
                return Err(self.error(&format!(
                    "expected a global declaration, 'func' or 'main', found {}",
                    self.describe_current()
                )));
            }
        }

        let main = main.ok_or_else(|| self.error("program has no main() function"))?;
        let init = std::mem::take(&mut self.init);

        Ok(Node::Root {
            globals: self.symbols.global_names().to_vec(),
            init: Box::new(Node::VarInitBlock(init)),
            functions: Box::new(Node::FunctionTable(functions)),
            main: Box::new(main),
        })
    }

    /// Registers every `func NAME ( params )` header with its arity.
    ///
    /// Malformed headers are skipped here and reported by the real parse.
    fn declare_functions(&mut self) -> Result<(), ParserError> {
        for i in 0..self.tokens.len() {
            if !self.tokens[i].is_keyword("func") {
                continue;
            }
            let Some(name) = self
                .tokens
                .get(i + 1)
                .filter(|t| t.kind == TokenKind::Identifier)
            else {
                continue;
            };

            let mut arity = 0;
            if self
                .tokens
                .get(i + 2)
                .is_some_and(|t| t.is(TokenKind::Brace, "("))
            {
                arity = self.tokens[i + 3..]
                    .iter()
                    .take_while(|t| !t.is(TokenKind::Brace, ")"))
                    .filter(|t| t.kind == TokenKind::Identifier)
                    .count();
            }

            self.symbols
                .declare_function(&name.text, arity)
                .map_err(|e| ParserError::from_name(e, name.span.line, name.span.col))?;
        }
        Ok(())
    }

    /// ```text
    /// function := 'func' IDENT '(' [ IDENT { ',' IDENT } ] ')' block
    /// ```
    fn parse_function(&mut self) -> Result<Node, ParserError> {
        self.advance(); // consume 'func'
        let (name, span) = self.expect_ident("function name")?;
        let sig = self
            .symbols
            .function(&name)
            .map_err(|e| self.name_error(e, span))?;

        self.expect(TokenKind::Brace, "(")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::Brace, ")") {
            loop {
                params.push(self.expect_ident("parameter name")?.0);
                if !self.eat(TokenKind::Separator, ",") {
                    break;
                }
            }
        }
        self.expect(TokenKind::Brace, ")")?;

        let function = self.parse_function_body(sig.id, name, params, span)?;
        Ok(Node::UserFunctionDecl(function))
    }

    /// ```text
    /// main_fn := 'main' '(' ')' block
    /// ```
    fn parse_main(&mut self) -> Result<Node, ParserError> {
        let span = self.current_span();
        self.advance(); // consume 'main'
        self.expect(TokenKind::Brace, "(")?;
        self.expect(TokenKind::Brace, ")")?;

        let function = self.parse_function_body(0, MAIN_FUNCTION.to_string(), Vec::new(), span)?;
        Ok(Node::MainFunction(function))
    }

    fn parse_function_body(
        &mut self,
        id: usize,
        name: String,
        params: Vec<String>,
        span: Span,
    ) -> Result<Function, ParserError> {
        self.symbols
            .enter_function(&params)
            .map_err(|e| self.name_error(e, span))?;
        let outer = std::mem::take(&mut self.init);

        let body = self.parse_block()?;

        let init = std::mem::replace(&mut self.init, outer);
        let layout = self.symbols.leave_function();

        Ok(Function {
            id,
            name,
            params: layout.params,
            locals: layout.locals,
            init: Box::new(Node::VarInitBlock(init)),
            body,
        })
    }

    /// ```text
    /// block := 'lol' { statement } 'kek'
    /// ```
    fn parse_block(&mut self) -> Result<Vec<Node>, ParserError> {
        self.expect(TokenKind::Keyword, "lol")?;

        let mut body = Vec::new();
        loop {
            if self.eat(TokenKind::Keyword, "kek") {
                return Ok(body);
            }
            if self.current().is_none() {
                return Err(self.error("expected 'kek' before end of input"));
            }
            if let Some(init) = self.parse_declaration()? {
                self.init.push(init);
                continue;
            }
            match self.parse_statement()? {
                Some(stmt) => body.push(stmt),
                None => {
                    return Err(self.error(&format!(
                        "expected a statement, found {}",
                        self.describe_current()
                    )));
                }
            }
        }
    }

    /// ```text
    /// decl := ('var' | 'int' | 'float') IDENT [ '=' expr ] ';'
    /// ```
    ///
    /// Declares the name in the current scope and returns the initializer
    /// assignment (to `0` when no initializer is given).
    fn parse_declaration(&mut self) -> RuleResult {
        let is_decl = self
            .current()
            .is_some_and(|t| TYPE_KEYWORDS.iter().any(|k| t.is_keyword(k)));
        if !is_decl {
            return Ok(None);
        }
        self.advance();

        let (name, span) = self.expect_ident("variable name")?;
        let value = if self.eat(TokenKind::Assign, "=") {
            self.expect_expression()?
        } else {
            Node::NumberLiteral(0.0)
        };
        self.expect(TokenKind::Separator, ";")?;

        let target = self
            .symbols
            .declare(&name)
            .map_err(|e| self.name_error(e, span))?;
        Ok(Some(Node::binary(Operator::Assign, var_node(target), value)))
    }

    fn parse_statement(&mut self) -> RuleResult {
        let Some(tok) = self.current() else {
            return Ok(None);
        };
        let (kind, text) = (tok.kind, tok.text.clone());

        match (kind, text.as_str()) {
            (TokenKind::Keyword, "if") => self.parse_if().map(Some),
            (TokenKind::Keyword, "while") => self.parse_while().map(Some),
            (TokenKind::Keyword, "return") => self.parse_return().map(Some),
            (TokenKind::Keyword, "scan") => self.parse_scan().map(Some),
            (TokenKind::Keyword, "print") => self.parse_print().map(Some),
            (TokenKind::Identifier, _) => self.parse_assignment_or_call().map(Some),
            _ => Ok(None),
        }
    }

    /// ```text
    /// if := 'if' '(' expr ')' block [ 'else' ( block | if ) ]
    /// ```
    fn parse_if(&mut self) -> Result<Node, ParserError> {
        self.advance(); // consume 'if'
        let cond = self.parse_condition()?;
        let then_body = self.parse_block()?;

        let else_body = if self.eat(TokenKind::Keyword, "else") {
            if self.check(TokenKind::Keyword, "if") {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Node::Logic(Logic::If {
            cond: Box::new(cond),
            then_body,
            else_body,
        }))
    }

    fn parse_while(&mut self) -> Result<Node, ParserError> {
        self.advance(); // consume 'while'
        let cond = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(Node::Logic(Logic::While {
            cond: Box::new(cond),
            body,
        }))
    }

    fn parse_condition(&mut self) -> Result<Node, ParserError> {
        self.expect(TokenKind::Brace, "(")?;
        let cond = self.expect_expression()?;
        self.expect(TokenKind::Brace, ")")?;
        Ok(cond)
    }

    fn parse_return(&mut self) -> Result<Node, ParserError> {
        self.advance(); // consume 'return'
        if self.eat(TokenKind::Separator, ";") {
            return Ok(Node::Return(None));
        }
        let value = self.expect_expression()?;
        self.expect(TokenKind::Separator, ";")?;
        Ok(Node::Return(Some(Box::new(value))))
    }

    /// ```text
    /// scan := 'scan' '(' IDENT ')' ';'
    /// ```
    fn parse_scan(&mut self) -> Result<Node, ParserError> {
        self.advance(); // consume 'scan'
        self.expect(TokenKind::Brace, "(")?;
        let (name, span) = self.expect_ident("variable name")?;
        let target = self
            .symbols
            .resolve(&name)
            .map_err(|e| self.name_error(e, span))?;
        self.expect(TokenKind::Brace, ")")?;
        self.expect(TokenKind::Separator, ";")?;

        Ok(Node::BuiltinCall {
            builtin: Builtin::Scan,
            args: vec![var_node(target)],
        })
    }

    fn parse_print(&mut self) -> Result<Node, ParserError> {
        self.advance(); // consume 'print'
        self.expect(TokenKind::Brace, "(")?;
        let value = self.expect_expression()?;
        self.expect(TokenKind::Brace, ")")?;
        self.expect(TokenKind::Separator, ";")?;

        Ok(Node::BuiltinCall {
            builtin: Builtin::Print,
            args: vec![value],
        })
    }

    /// ```text
    /// IDENT ('=' | '+=' | '-=' | '*=' | '/=') expr ';'
    /// IDENT '(' args ')' ';'
    /// ```
    fn parse_assignment_or_call(&mut self) -> Result<Node, ParserError> {
        let (name, span) = self.expect_ident("identifier")?;

        if self.check(TokenKind::Brace, "(") {
            let call = self.parse_call(&name, span)?;
            self.expect(TokenKind::Separator, ";")?;
            return Ok(call);
        }

        let op = self
            .current()
            .filter(|t| t.kind == TokenKind::Assign)
            .and_then(|t| Operator::from_assign_symbol(&t.text));
        let Some(op) = op else {
            return Err(self.error(&format!(
                "expected assignment or call after '{}', found {}",
                name,
                self.describe_current()
            )));
        };
        self.advance();

        let target = self
            .symbols
            .resolve(&name)
            .map_err(|e| self.name_error(e, span))?;
        let value = self.expect_expression()?;
        self.expect(TokenKind::Separator, ";")?;

        Ok(Node::binary(op, var_node(target), value))
    }

    /// Parses `( args )` after a function name already consumed.
    fn parse_call(&mut self, name: &str, span: Span) -> Result<Node, ParserError> {
        let sig = self
            .symbols
            .function(name)
            .map_err(|e| self.name_error(e, span))?;
        self.expect(TokenKind::Brace, "(")?;
        let mut args = Vec::new();
        if !self.check(TokenKind::Brace, ")") {
            loop {
                args.push(self.expect_expression()?);
                if !self.eat(TokenKind::Separator, ",") {
                    break;
                }
            }
        }
        self.expect(TokenKind::Brace, ")")?;

        if args.len() != sig.arity {
            return Err(ParserError {
                kind: ParseErrorKind::Syntax,
                message: format!(
                    "'{}' takes {} argument(s) but {} were given",
                    name,
                    sig.arity,
                    args.len()
                ),
                line: span.line,
                col: span.col,
            });
        }

        Ok(Node::BuiltinCall {
            builtin: Builtin::Call(sig.id),
            args,
        })
    }

    // ============================================================
    // Expressions
    // ============================================================

    fn expect_expression(&mut self) -> Result<Node, ParserError> {
        match self.parse_expression()? {
            Some(expr) => Ok(expr),
            None => Err(self.error(&format!(
                "expected expression, found {}",
                self.describe_current()
            ))),
        }
    }

    /// Lowest to highest binding:
    ///
    /// ```text
    /// ||   &&   == != < > <= >=   + -   * /   unary - !
    /// ```
    ///
    /// All binary levels are left-associative.
    fn parse_expression(&mut self) -> RuleResult {
        self.parse_or()
    }

    fn parse_or(&mut self) -> RuleResult {
        self.parse_left_assoc(OR_LEVEL, Self::parse_and)
    }

    fn parse_and(&mut self) -> RuleResult {
        self.parse_left_assoc(AND_LEVEL, Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> RuleResult {
        self.parse_left_assoc(COMPARE_LEVEL, Self::parse_sum)
    }

    fn parse_sum(&mut self) -> RuleResult {
        self.parse_left_assoc(SUM_LEVEL, Self::parse_term)
    }

    fn parse_term(&mut self) -> RuleResult {
        self.parse_left_assoc(TERM_LEVEL, Self::parse_unary)
    }

    fn parse_left_assoc(
        &mut self,
        level: &[Operator],
        next: fn(&mut Parser) -> RuleResult,
    ) -> RuleResult {
        let Some(mut lhs) = next(self)? else {
            return Ok(None);
        };

        while let Some(op) = self.peek_operator(level) {
            self.advance();
            let Some(rhs) = next(self)? else {
                return Err(self.error(&format!(
                    "expected expression after '{}', found {}",
                    op.symbol(),
                    self.describe_current()
                )));
            };
            lhs = Node::binary(op, lhs, rhs);
        }

        Ok(Some(lhs))
    }

    fn peek_operator(&self, level: &[Operator]) -> Option<Operator> {
        let tok = self.current().filter(|t| t.kind == TokenKind::Operator)?;
        Operator::from_binary_symbol(&tok.text).filter(|op| level.contains(op))
    }

    fn parse_unary(&mut self) -> RuleResult {
        let op = if self.check(TokenKind::Operator, "-") {
            Operator::Minus
        } else if self.check(TokenKind::Operator, "!") {
            Operator::Not
        } else {
            return self.parse_primary();
        };
        self.advance();

        match self.parse_unary()? {
            Some(operand) => Ok(Some(Node::unary(op, operand))),
            None => Err(self.error(&format!(
                "expected operand after '{}', found {}",
                op.symbol(),
                self.describe_current()
            ))),
        }
    }

    /// ```text
    /// primary := NUMBER | IDENT | IDENT '(' args ')'
    ///          | ('sin' | 'cos' | 'sqrt') '(' expr ')' | '(' expr ')'
    /// ```
    fn parse_primary(&mut self) -> RuleResult {
        let Some(tok) = self.current() else {
            return Ok(None);
        };
        let (kind, text, span) = (tok.kind, tok.text.clone(), tok.span);

        match kind {
            TokenKind::Integer | TokenKind::Float => {
                self.advance();
                let value: f64 = text
                    .parse()
                    .map_err(|_| self.error(&format!("invalid number '{}'", text)))?;
                Ok(Some(Node::NumberLiteral(value)))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.check(TokenKind::Brace, "(") {
                    return self.parse_call(&text, span).map(Some);
                }
                let var = self
                    .symbols
                    .resolve(&text)
                    .map_err(|e| self.name_error(e, span))?;
                Ok(Some(var_node(var)))
            }
            TokenKind::Keyword if matches!(text.as_str(), "sin" | "cos" | "sqrt") => {
                self.advance();
                let builtin = match text.as_str() {
                    "sin" => Builtin::Sin,
                    "cos" => Builtin::Cos,
                    _ => Builtin::Sqrt,
                };
                let arg = self.parse_condition()?;
                Ok(Some(Node::BuiltinCall {
                    builtin,
                    args: vec![arg],
                }))
            }
            TokenKind::Brace if text == "(" => {
                self.advance();
                let inner = self.expect_expression()?;
                self.expect(TokenKind::Brace, ")")?;
                Ok(Some(inner))
            }
            _ => Ok(None),
        }
    }
}

fn var_node(var: VarRef) -> Node {
    match var {
        VarRef::Global(slot) => Node::GlobalVarRef(slot),
        VarRef::Param(slot) => Node::ParamRef(slot),
        VarRef::Local(slot) => Node::LocalVarRef(slot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn parse(src: &str) -> Result<Node, ParserError> {
        let tokens = Lexer::new(src).tokenize().expect("lexing should succeed");
        Parser::new(tokens).parse()
    }

    fn parse_ok(src: &str) -> Node {
        parse(src).expect("parse should succeed")
    }

    fn main_of(root: &Node) -> &Function {
        match root {
            Node::Root { main, .. } => match main.as_ref() {
                Node::MainFunction(f) => f,
                other => panic!("expected main, got {:?}", other),
            },
            other => panic!("expected root, got {:?}", other),
        }
    }

    fn functions_of(root: &Node) -> &[Node] {
        match root {
            Node::Root { functions, .. } => match functions.as_ref() {
                Node::FunctionTable(fs) => fs,
                other => panic!("expected function table, got {:?}", other),
            },
            other => panic!("expected root, got {:?}", other),
        }
    }

    /// Parses `main() lol print(<expr>); kek` and returns the expression.
    fn expr(src: &str) -> Node {
        let root = parse_ok(&format!("var a; var b; var c; main() lol print({}); kek", src));
        match &main_of(&root).body[0] {
            Node::BuiltinCall { args, .. } => args[0].clone(),
            other => panic!("expected print, got {:?}", other),
        }
    }

    fn assert_error(src: &str, kind: ParseErrorKind, contains: &str) {
        match parse(src) {
            Ok(root) => panic!("expected error containing '{}', got {:?}", contains, root),
            Err(e) => {
                assert_eq!(e.kind, kind, "wrong error kind: {}", e);
                assert!(
                    e.message.contains(contains),
                    "expected error containing '{}', got: {}",
                    contains,
                    e.message
                );
            }
        }
    }

    // ============================================================
    // Structure
    // ============================================================

    #[test]
    fn test_minimal_program() {
        let root = parse_ok("main() lol kek");
        match &root {
            Node::Root {
                globals,
                init,
                functions,
                main,
            } => {
                assert!(globals.is_empty());
                assert_eq!(**init, Node::VarInitBlock(vec![]));
                assert_eq!(**functions, Node::FunctionTable(vec![]));
                assert!(matches!(**main, Node::MainFunction(_)));
            }
            other => panic!("expected root, got {:?}", other),
        }
    }

    #[test]
    fn test_global_initializers_in_order() {
        let root = parse_ok("var x = 1; int y; main() lol kek");
        let Node::Root { globals, init, .. } = &root else {
            panic!("expected root");
        };
        assert_eq!(globals, &vec!["x".to_string(), "y".to_string()]);
        assert_eq!(
            **init,
            Node::VarInitBlock(vec![
                Node::binary(Operator::Assign, Node::GlobalVarRef(0), Node::NumberLiteral(1.0)),
                Node::binary(Operator::Assign, Node::GlobalVarRef(1), Node::NumberLiteral(0.0)),
            ])
        );
    }

    #[test]
    fn test_function_params_and_locals() {
        let root = parse_ok("func f(n) lol var a = n; var b = n * 10; return a; kek main() lol kek");
        let Node::UserFunctionDecl(f) = &functions_of(&root)[0] else {
            panic!("expected function");
        };
        assert_eq!(f.id, 1);
        assert_eq!(f.params, vec!["n".to_string()]);
        assert_eq!(f.locals, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(f.frame_size(), 3);
        assert_eq!(
            f.body,
            vec![Node::Return(Some(Box::new(Node::LocalVarRef(1))))]
        );
        let Node::VarInitBlock(inits) = f.init.as_ref() else {
            panic!("expected init block");
        };
        assert_eq!(
            inits[0],
            Node::binary(Operator::Assign, Node::LocalVarRef(1), Node::ParamRef(0))
        );
    }

    #[test]
    fn test_declarations_in_nested_blocks_are_hoisted() {
        let root = parse_ok("main() lol var i = 0; while (i < 3) lol var t = i; i += 1; kek kek");
        let main = main_of(&root);
        assert_eq!(main.locals, vec!["i".to_string(), "t".to_string()]);
        let Node::VarInitBlock(inits) = main.init.as_ref() else {
            panic!("expected init block");
        };
        assert_eq!(inits.len(), 2);
        let Node::Logic(Logic::While { body, .. }) = &main.body[0] else {
            panic!("expected while");
        };
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_forward_call_resolves() {
        let root = parse_ok("func a() lol return b(1); kek func b(x) lol return x; kek main() lol a(); kek");
        let main = main_of(&root);
        assert_eq!(
            main.body[0],
            Node::BuiltinCall {
                builtin: Builtin::Call(1),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_else_if_chain() {
        let root = parse_ok("main() lol if (1) lol kek else if (2) lol kek else lol print(3); kek kek");
        let Node::Logic(Logic::If { else_body, .. }) = &main_of(&root).body[0] else {
            panic!("expected if");
        };
        let nested = else_body.as_ref().expect("else branch");
        assert!(matches!(
            &nested[0],
            Node::Logic(Logic::If {
                else_body: Some(_),
                ..
            })
        ));
    }

    #[test]
    fn test_scan_and_compound_assignment() {
        let root = parse_ok("main() lol var x; scan(x); x *= 2; kek");
        let main = main_of(&root);
        assert_eq!(
            main.body[0],
            Node::BuiltinCall {
                builtin: Builtin::Scan,
                args: vec![Node::LocalVarRef(0)]
            }
        );
        assert_eq!(
            main.body[1],
            Node::binary(
                Operator::MultiplyAssign,
                Node::LocalVarRef(0),
                Node::NumberLiteral(2.0)
            )
        );
    }

    // ============================================================
    // Precedence
    // ============================================================

    #[test]
    fn test_mul_binds_tighter_than_add() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Node::binary(
                Operator::Plus,
                Node::NumberLiteral(1.0),
                Node::binary(Operator::Multiply, Node::NumberLiteral(2.0), Node::NumberLiteral(3.0))
            )
        );
    }

    #[test]
    fn test_sub_is_left_associative() {
        assert_eq!(
            expr("a - b - c"),
            Node::binary(
                Operator::Minus,
                Node::binary(Operator::Minus, Node::GlobalVarRef(0), Node::GlobalVarRef(1)),
                Node::GlobalVarRef(2)
            )
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(
            expr("a || b && c"),
            Node::binary(
                Operator::Or,
                Node::GlobalVarRef(0),
                Node::binary(Operator::And, Node::GlobalVarRef(1), Node::GlobalVarRef(2))
            )
        );
    }

    #[test]
    fn test_comparison_below_arithmetic() {
        assert_eq!(
            expr("a + 1 < b * 2"),
            Node::binary(
                Operator::Lower,
                Node::binary(Operator::Plus, Node::GlobalVarRef(0), Node::NumberLiteral(1.0)),
                Node::binary(Operator::Multiply, Node::GlobalVarRef(1), Node::NumberLiteral(2.0))
            )
        );
    }

    #[test]
    fn test_unary_and_builtins() {
        assert_eq!(
            expr("-sqrt(a)"),
            Node::unary(
                Operator::Minus,
                Node::BuiltinCall {
                    builtin: Builtin::Sqrt,
                    args: vec![Node::GlobalVarRef(0)]
                }
            )
        );
        assert_eq!(
            expr("!(a == b)"),
            Node::unary(
                Operator::Not,
                Node::binary(Operator::Equal, Node::GlobalVarRef(0), Node::GlobalVarRef(1))
            )
        );
    }

    // ============================================================
    // Errors
    // ============================================================

    #[test]
    fn test_missing_main() {
        assert_error("var x;", ParseErrorKind::Syntax, "no main");
    }

    #[test]
    fn test_duplicate_main() {
        assert_error("main() lol kek main() lol kek", ParseErrorKind::Name, "main");
    }

    #[test]
    fn test_local_redeclaration() {
        assert_error(
            "main() lol var x; var x = 2; kek",
            ParseErrorKind::Name,
            "already declared",
        );
    }

    #[test]
    fn test_undefined_variable() {
        assert_error("main() lol y = 1; kek", ParseErrorKind::Name, "'y' is not declared");
    }

    #[test]
    fn test_locals_do_not_leak_between_functions() {
        assert_error(
            "func f() lol var t; kek main() lol print(t); kek",
            ParseErrorKind::Name,
            "'t'",
        );
    }

    #[test]
    fn test_duplicate_function() {
        assert_error(
            "func f() lol kek func f() lol kek main() lol kek",
            ParseErrorKind::Name,
            "'f'",
        );
    }

    #[test]
    fn test_arity_mismatch() {
        assert_error(
            "func f(a, b) lol kek main() lol f(1); kek",
            ParseErrorKind::Syntax,
            "takes 2 argument(s) but 1",
        );
    }

    #[test]
    fn test_missing_kek() {
        assert_error("main() lol print(1);", ParseErrorKind::Syntax, "'kek'");
    }

    #[test]
    fn test_missing_semicolon() {
        assert_error("main() lol print(1) kek", ParseErrorKind::Syntax, "expected ';'");
    }

    #[test]
    fn test_error_location() {
        let err = parse("main() lol\n  x = 1;\nkek").unwrap_err();
        assert_eq!((err.line, err.col), (2, 3));
    }
}
