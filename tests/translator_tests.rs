use std::fs;

use onnx_secure_codegen::{
    model::{Attribute, DataType, OperatorNode, Party, Program, ProgramNode, TensorRef, ValueInfo, VarBinding},
    Backend, Error, NumericMode, ProgramLoader, TranslationOptions, Translator,
};

// Conv followed by a ReLU, the smallest network that exercises truncation and release
fn conv_relu_program() -> (Program, ValueInfo) {
    let conv = OperatorNode::new("Conv", &["x", "w"], &["h"])
        .with_attribute("kernel_shape", Attribute::Ints(vec![3, 3]))
        .with_attribute("strides", Attribute::Ints(vec![1, 1]))
        .with_attribute("pads", Attribute::Ints(vec![1, 1, 1, 1]));

    let program = Program::new(
        "convnet",
        vec![
            ProgramNode::Input(TensorRef::new("x", &[1, 3, 32, 32], DataType::Float, Party::Alice)),
            ProgramNode::Operator(conv),
            ProgramNode::Operator(OperatorNode::new("Relu", &["h"], &["y"])),
            ProgramNode::Output(TensorRef::new("y", &[1, 16, 32, 32], DataType::Float, Party::Bob)),
        ],
    );

    let value_info = ValueInfo::new()
        .with("x", DataType::Float, &[1, 3, 32, 32])
        .with("w", DataType::Float, &[16, 3, 3, 3])
        .with("h", DataType::Float, &[1, 16, 32, 32])
        .with("y", DataType::Float, &[1, 16, 32, 32]);

    (program, value_info)
}

fn llama_translator() -> Translator {
    let options = TranslationOptions::new()
        .set_mode(NumericMode::UnsignedFixed)
        .set_scale(12)
        .set_backend(Backend::Llama);
    Translator::new(options).unwrap()
}

#[test]
fn test_conv_translation_for_llama() {
    let (program, value_info) = conv_relu_program();
    let code = llama_translator()
        .translate(&program, &value_info, VarBinding::new())
        .unwrap();

    assert!(code.contains("auto var0 = take_input<u64>(ALICE, {1, 3, 32, 32}, scale);"));
    assert!(code.contains("new Conv2D<u64>(3, 16, 3, 1, 1, false),\n        new Truncate<u64>(12),\n"));
    assert!(code.contains("new ReLU<u64>({1, 16, 32, 32}, {\"var2\"}, {\"var3\"}),"));
    assert!(code.contains("// Output of variable 'y' of shape [1, 16, 32, 32] as var3 to BOB"));
    assert!(code.contains("reveal_output(BOB, model.tensor(\"var3\"));"));
    assert!(code.contains("model.forward(var0);"));

    // Sections appear in emission order
    let input = code.find("take_input").unwrap();
    let pipeline = code.find("auto model = Sequential<u64>({").unwrap();
    let forward = code.find("model.forward").unwrap();
    let reveal = code.find("reveal_output").unwrap();
    assert!(input < pipeline && pipeline < forward && forward < reveal);
}

#[test]
fn test_each_multiply_is_followed_by_one_truncation() {
    let (program, value_info) = conv_relu_program();
    let code = llama_translator()
        .translate(&program, &value_info, VarBinding::new())
        .unwrap();

    assert_eq!(code.matches("new Conv2D<").count(), 1);
    assert_eq!(code.matches("new Truncate<").count(), 1);
}

#[test]
fn test_float_mode_has_no_truncation() {
    let (program, value_info) = conv_relu_program();
    let translator = Translator::from_identifiers("float", None, "SECFLOAT").unwrap();
    let code = translator
        .translate(&program, &value_info, VarBinding::new())
        .unwrap();

    assert!(code.contains("new Conv2D<float>(3, 16, 3, 1, 1, false),"));
    assert!(!code.contains("Truncate"));
    assert!(code.contains("take_input<float>(ALICE, {1, 3, 32, 32});"));
}

#[test]
fn test_deallocation_follows_last_use() {
    let (program, value_info) = conv_relu_program();
    let code = llama_translator()
        .translate(&program, &value_info, VarBinding::new())
        .unwrap();

    let conv = code.find("new Conv2D").unwrap();
    let relu = code.find("new ReLU").unwrap();
    let free_x = code.find("new Free<u64>(\"var0\"),").unwrap();
    let free_h = code.find("new Free<u64>(\"var2\"),").unwrap();
    assert!(conv < free_x && free_x < relu && relu < free_h);

    // Neither the graph output nor the conv weights are released
    assert!(!code.contains("new Free<u64>(\"var3\")"));
    assert!(!code.contains("new Free<u64>(\"var1\")"));
}

#[test]
fn test_revealed_intermediate_is_not_freed_before_reveal() {
    let program = Program::new(
        "two_heads",
        vec![
            ProgramNode::Input(TensorRef::new("x", &[1, 4], DataType::Float, Party::Alice)),
            ProgramNode::Operator(OperatorNode::new("Relu", &["x"], &["a"])),
            ProgramNode::Output(TensorRef::new("a", &[1, 4], DataType::Float, Party::Bob)),
            ProgramNode::Operator(OperatorNode::new("Sigmoid", &["a"], &["b"])),
            ProgramNode::Output(TensorRef::new("b", &[1, 4], DataType::Float, Party::Bob)),
        ],
    );
    let value_info = ValueInfo::new()
        .with("x", DataType::Float, &[1, 4])
        .with("a", DataType::Float, &[1, 4])
        .with("b", DataType::Float, &[1, 4]);

    let code = llama_translator()
        .translate(&program, &value_info, VarBinding::new())
        .unwrap();

    assert!(code.contains("new Free<u64>(\"var0\"),"));
    assert!(!code.contains("new Free<u64>(\"var1\")"));
    assert!(!code.contains("new Free<u64>(\"var2\")"));
    assert!(code.contains("reveal_output(BOB, model.tensor(\"var1\"));"));
    assert!(code.contains("reveal_output(BOB, model.tensor(\"var2\"));"));
}

#[test]
fn test_cleartext_has_no_deallocation_by_default() {
    let (program, value_info) = conv_relu_program();
    let translator = Translator::from_identifiers("i64", Some(8), "cleartext").unwrap();
    let code = translator
        .translate(&program, &value_info, VarBinding::new())
        .unwrap();

    assert!(!code.contains("new Free<"));
    assert!(!code.contains("take_input"));
    assert!(code.contains("Tensor<i64> var0({1, 3, 32, 32});"));
    assert!(code.contains("new Truncate<i64>(8),"));
}

#[test]
fn test_deallocation_can_be_disabled() {
    let (program, value_info) = conv_relu_program();
    let options = TranslationOptions::new()
        .set_mode(NumericMode::UnsignedFixed)
        .set_scale(12)
        .set_backend(Backend::Llama)
        .enable_deallocation(false);
    let code = Translator::new(options)
        .unwrap()
        .translate(&program, &value_info, VarBinding::new())
        .unwrap();

    assert!(!code.contains("new Free<"));
}

#[test]
fn test_unsupported_operator_writes_nothing() {
    let (mut program, mut value_info) = conv_relu_program();
    program.nodes.insert(
        2,
        ProgramNode::Operator(OperatorNode::new("LSTM", &["h"], &["g"])),
    );
    value_info.insert("g", DataType::Float, &[1, 16, 32, 32]);

    let dir = tempfile::tempdir().unwrap();
    let result = llama_translator().export(&program, &value_info, VarBinding::new(), dir.path());

    assert!(matches!(result, Err(Error::UnsupportedOperator(_))));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_value_info_is_reported() {
    let (program, full) = conv_relu_program();
    let mut value_info = ValueInfo::new();
    for name in ["x", "h", "y"] {
        let info = full.get(name).unwrap();
        value_info.insert(name, info.data_type, &info.shape);
    }

    let result = llama_translator().translate(&program, &value_info, VarBinding::new());
    assert!(matches!(result, Err(Error::UnknownTensor(name)) if name == "w"));
}

#[test]
fn test_export_writes_named_artifact() -> anyhow::Result<()> {
    let (program, value_info) = conv_relu_program();
    let dir = tempfile::tempdir()?;

    let path = llama_translator().export(&program, &value_info, VarBinding::new(), dir.path())?;
    assert_eq!(path, dir.path().join("convnet_LLAMA.cpp"));

    let text = fs::read_to_string(&path)?;
    assert!(text.starts_with("#include <sytorch/backend/llama_extended.h>\n"));
    assert!(text.trim_end().ends_with('}'));
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn test_same_padding_with_concat_and_reshape() {
    let conv = OperatorNode::new("Conv", &["x", "w"], &["a"])
        .with_attribute("kernel_shape", Attribute::Ints(vec![3, 3]))
        .with_attribute("strides", Attribute::Ints(vec![1, 1]))
        .with_attribute("auto_pad", Attribute::String("SAME_UPPER".to_string()));
    let concat = OperatorNode::new("Concat", &["a", "x"], &["c"])
        .with_attribute("axis", Attribute::Int(1));

    let program = Program::new(
        "branchy",
        vec![
            ProgramNode::Input(TensorRef::new("x", &[1, 2, 4, 4], DataType::Float, Party::Alice)),
            ProgramNode::Operator(conv),
            ProgramNode::Operator(concat),
            ProgramNode::Operator(OperatorNode::new("Reshape", &["c", "shape"], &["r"])),
            ProgramNode::Output(TensorRef::new("r", &[1, 64], DataType::Float, Party::Bob)),
        ],
    );
    let value_info = ValueInfo::new()
        .with("x", DataType::Float, &[1, 2, 4, 4])
        .with("w", DataType::Float, &[2, 2, 3, 3])
        .with("a", DataType::Float, &[1, 2, 4, 4])
        .with("c", DataType::Float, &[1, 4, 4, 4])
        .with("r", DataType::Float, &[1, 64]);

    let code = Translator::from_identifiers("float", None, "CLEARTEXT")
        .unwrap()
        .translate(&program, &value_info, VarBinding::new())
        .unwrap();

    assert!(code.contains("new Conv2D<float>(2, 2, 3, 1, 1, false),"));
    assert!(code.contains("new Concat2T4x4To4<float>({1, 4, 4, 4}, {\"var2\", \"var0\"}, 1, {\"var3\"}),"));
    assert!(code.contains("new Reshape<float>({1, 64}, [](Tensor<float> &var3, Tensor<float> &var5) {"));
}

#[test]
fn test_reshape_shape_operand_is_not_freed() {
    let program = Program::new(
        "flatten",
        vec![
            ProgramNode::Input(TensorRef::new("x", &[1, 2, 2], DataType::Float, Party::Alice)),
            ProgramNode::Operator(OperatorNode::new("Reshape", &["x", "shape"], &["r"])),
            ProgramNode::Operator(OperatorNode::new("Relu", &["r"], &["y"])),
            ProgramNode::Output(TensorRef::new("y", &[1, 4], DataType::Float, Party::Bob)),
        ],
    );
    let value_info = ValueInfo::new()
        .with("x", DataType::Float, &[1, 2, 2])
        .with("r", DataType::Float, &[1, 4])
        .with("y", DataType::Float, &[1, 4]);

    let code = llama_translator()
        .translate(&program, &value_info, VarBinding::new())
        .unwrap();

    // x is var0, the shape operand var1, r var2
    assert!(code.contains("new Free<u64>(\"var0\"),"));
    assert!(code.contains("new Free<u64>(\"var2\"),"));
    assert!(!code.contains("new Free<u64>(\"var1\")"));
}

#[test]
fn test_loaded_document_round_trip() -> anyhow::Result<()> {
    let text = r#"{
        "name": "mlp",
        "nodes": [
            {"kind": "input", "name": "x", "shape": [1, 8], "data_type": "float", "party": "alice"},
            {"kind": "operator", "op_type": "Gemm", "inputs": ["x", "w", "b"], "outputs": ["h"]},
            {"kind": "operator", "op_type": "Softmax", "inputs": ["h"], "outputs": ["y"]},
            {"kind": "output", "name": "y", "shape": [1, 4], "data_type": "float", "party": "bob"}
        ],
        "value_info": {
            "x": {"data_type": "float", "shape": [1, 8]},
            "w": {"data_type": "float", "shape": [8, 4]},
            "b": {"data_type": "float", "shape": [4]},
            "h": {"data_type": "float", "shape": [1, 4]},
            "y": {"data_type": "float", "shape": [1, 4]}
        }
    }"#;

    let loaded = ProgramLoader::from_str(text, "unused")?;
    let code = llama_translator().translate(&loaded.program, &loaded.value_info, loaded.bindings)?;

    assert!(code.contains("new FC<u64>(8, 4, true),\n        new Truncate<u64>(12),\n"));
    assert!(code.contains("new Softmax<u64>({1, 4}, {\"var3\"}, {\"var4\"}),"));
    assert!(code.contains("model.load(\"mlp_weights.dat\", scale);"));
    Ok(())
}
