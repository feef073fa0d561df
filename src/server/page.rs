use axum::response::Html;

pub async fn index() -> Html<&'static str> {
    Html(
        r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Virtual Try-On</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            padding: 20px;
        }

        .container {
            max-width: 900px;
            margin: 0 auto;
        }

        header {
            text-align: center;
            color: white;
            margin-bottom: 32px;
        }

        header h1 {
            font-size: 2.5em;
            margin-bottom: 8px;
        }

        .card {
            background: white;
            border-radius: 20px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            padding: 32px;
            margin-bottom: 24px;
        }

        h2 {
            color: #333;
            margin-bottom: 16px;
        }

        .input-group {
            margin-bottom: 20px;
        }

        label {
            display: block;
            font-weight: 600;
            color: #444;
            margin-bottom: 8px;
        }

        input[type="password"], input[type="text"], select {
            width: 100%;
            padding: 12px;
            border: 2px solid #e0e0e0;
            border-radius: 10px;
            font-size: 1em;
        }

        .uploads {
            display: grid;
            grid-template-columns: 1fr 1fr;
            gap: 20px;
        }

        .upload-area {
            border: 3px dashed #667eea;
            border-radius: 15px;
            padding: 40px 20px;
            text-align: center;
            cursor: pointer;
            transition: all 0.3s;
            background: #f8f9ff;
            min-height: 220px;
            position: relative;
        }

        .upload-area:hover {
            border-color: #764ba2;
            background: #f0f2ff;
        }

        .upload-area.dragover {
            border-color: #764ba2;
            background: #e8ebff;
            transform: scale(1.02);
        }

        .upload-area img {
            max-width: 100%;
            max-height: 260px;
            border-radius: 10px;
        }

        .upload-hint {
            color: #999;
            font-size: 0.9em;
        }

        .remove {
            position: absolute;
            top: 8px;
            right: 8px;
            display: none;
        }

        input[type="file"] {
            display: none;
        }

        .actions {
            display: flex;
            gap: 12px;
        }

        button {
            background: #667eea;
            color: white;
            border: none;
            border-radius: 10px;
            padding: 12px 24px;
            font-size: 1em;
            font-weight: 600;
            cursor: pointer;
        }

        button.secondary {
            background: white;
            color: #667eea;
            border: 2px solid #667eea;
        }

        button:disabled {
            opacity: 0.5;
            cursor: not-allowed;
        }

        .loading {
            text-align: center;
            padding: 40px;
            display: none;
        }

        .spinner {
            border: 4px solid #f3f3f3;
            border-top: 4px solid #667eea;
            border-radius: 50%;
            width: 50px;
            height: 50px;
            animation: spin 1s linear infinite;
            margin: 0 auto 20px;
        }

        @keyframes spin {
            0% { transform: rotate(0deg); }
            100% { transform: rotate(360deg); }
        }

        .results {
            display: none;
            grid-template-columns: 1fr 1fr;
            gap: 20px;
        }

        .results figure img {
            max-width: 100%;
            border-radius: 10px;
            box-shadow: 0 4px 15px rgba(0,0,0,0.1);
        }

        .results figcaption {
            display: flex;
            justify-content: space-between;
            margin-top: 8px;
            color: #666;
        }

        .error {
            background: #fee;
            border: 2px solid #fcc;
            color: #c33;
            padding: 15px;
            border-radius: 10px;
            margin-bottom: 20px;
            display: none;
        }
    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1>✨ Virtual Try-On</h1>
            <p>Upload a model photo and a garment, get the garment on the model</p>
        </header>

        <form id="tryonForm">
            <div class="card">
                <h2>API Configuration</h2>
                <div class="input-group">
                    <label for="apiKey">API Key</label>
                    <input id="apiKey" name="apiKey" type="password" placeholder="Enter your API key" autocomplete="off">
                </div>
                <div class="actions">
                    <button type="button" class="secondary" id="statusButton">Check API status</button>
                    <span id="statusText"></span>
                </div>
            </div>

            <div class="card">
                <h2>Upload Images</h2>
                <div class="uploads">
                    <div class="input-group">
                        <label>Model Image</label>
                        <div class="upload-area" data-field="modelImg">
                            <button type="button" class="secondary remove">✕</button>
                            <div class="upload-hint">📸 Photo of the person<br>Click or drag image here</div>
                            <input type="file" accept="image/*">
                        </div>
                    </div>
                    <div class="input-group">
                        <label>Garment Image</label>
                        <div class="upload-area" data-field="garmentImg">
                            <button type="button" class="secondary remove">✕</button>
                            <div class="upload-hint">👕 The clothing item<br>Click or drag image here</div>
                            <input type="file" accept="image/*">
                        </div>
                    </div>
                </div>

                <div class="input-group">
                    <label for="category">Clothing Category</label>
                    <select id="category" name="category">
                        <option value="upper_body">Upper Body (Shirts, Jackets, etc.)</option>
                        <option value="lower_body">Lower Body (Pants, Skirts, etc.)</option>
                        <option value="dresses">Dresses</option>
                    </select>
                </div>

                <div class="input-group">
                    <label for="garmentDesc">Garment Description (optional)</label>
                    <input id="garmentDesc" name="garmentDesc" type="text" placeholder="e.g. red silk blouse">
                </div>

                <div class="error" id="error"></div>

                <div class="actions">
                    <button type="submit" id="submitButton">Change Clothes</button>
                    <button type="button" class="secondary" id="demoButton">Test with demo images</button>
                    <button type="button" class="secondary" id="resetButton">Reset</button>
                </div>
            </div>
        </form>

        <div class="card loading" id="loading">
            <div class="spinner"></div>
            <p id="loadingText">Working...</p>
        </div>

        <div class="card results" id="results">
            <figure>
                <img id="resultImage" alt="Result">
                <figcaption>Result <a id="resultDownload" download target="_blank" rel="noopener">Download</a></figcaption>
            </figure>
            <figure>
                <img id="maskImage" alt="Mask">
                <figcaption>Mask <a id="maskDownload" download target="_blank" rel="noopener">Download</a></figcaption>
            </figure>
        </div>
    </div>

    <script>
        const files = { modelImg: null, garmentImg: null };
        const form = document.getElementById('tryonForm');
        const errorDiv = document.getElementById('error');
        const loading = document.getElementById('loading');
        const loadingText = document.getElementById('loadingText');
        const results = document.getElementById('results');
        const buttons = ['submitButton', 'demoButton'].map(id => document.getElementById(id));
        // Bumped on every submit and reset; responses from older runs are ignored.
        let generation = 0;

        document.querySelectorAll('.upload-area').forEach(area => {
            const field = area.dataset.field;
            const input = area.querySelector('input[type="file"]');
            const hint = area.querySelector('.upload-hint');
            const remove = area.querySelector('.remove');
            const hintHtml = hint.innerHTML;

            const select = (file) => {
                if (!file || !file.type.startsWith('image/')) return;
                files[field] = file;
                const reader = new FileReader();
                reader.onload = (e) => {
                    hint.innerHTML = '<img alt="Preview">';
                    hint.querySelector('img').src = e.target.result;
                    remove.style.display = 'block';
                };
                reader.readAsDataURL(file);
            };

            area.addEventListener('click', (e) => {
                if (e.target !== remove) input.click();
            });
            area.addEventListener('dragover', (e) => {
                e.preventDefault();
                area.classList.add('dragover');
            });
            area.addEventListener('dragleave', () => area.classList.remove('dragover'));
            area.addEventListener('drop', (e) => {
                e.preventDefault();
                area.classList.remove('dragover');
                select(e.dataTransfer.files[0]);
            });
            input.addEventListener('change', (e) => select(e.target.files[0]));
            remove.addEventListener('click', (e) => {
                e.stopPropagation();
                files[field] = null;
                input.value = '';
                hint.innerHTML = hintHtml;
                remove.style.display = 'none';
            });
            area.clearSelection = () => remove.click();
        });

        function showError(message) {
            errorDiv.textContent = message;
            errorDiv.style.display = message ? 'block' : 'none';
        }

        function setBusy(busy, text) {
            loading.style.display = busy ? 'block' : 'none';
            loadingText.textContent = text || 'Working...';
            buttons.forEach(b => b.disabled = busy);
        }

        function showResult(result) {
            results.style.display = 'grid';
            document.getElementById('resultImage').src = result.resultImageUrl || '';
            document.getElementById('resultDownload').href = result.resultImageUrl || '#';
            document.getElementById('maskImage').src = result.maskImageUrl || '';
            document.getElementById('maskDownload').href = result.maskImageUrl || '#';
        }

        async function send(url, body, text) {
            const run = ++generation;
            showError('');
            results.style.display = 'none';
            setBusy(true, text);
            try {
                const response = await fetch(url, { method: 'POST', body });
                const result = await response.json();
                if (run !== generation) return;
                if (result.error) {
                    showError(result.error);
                } else {
                    showResult(result);
                }
            } catch (error) {
                if (run !== generation) return;
                showError('Network error: ' + error.message);
            } finally {
                if (run === generation) setBusy(false);
            }
        }

        form.addEventListener('submit', (e) => {
            e.preventDefault();
            const apiKey = document.getElementById('apiKey').value;
            if (!apiKey.trim()) return showError('Please enter your API key');
            if (!files.modelImg) return showError('Please upload a model image');
            if (!files.garmentImg) return showError('Please upload a garment image');

            const body = new FormData();
            body.append('apiKey', apiKey);
            body.append('modelImg', files.modelImg);
            body.append('garmentImg', files.garmentImg);
            body.append('category', document.getElementById('category').value);
            const desc = document.getElementById('garmentDesc').value.trim();
            if (desc) body.append('garmentDesc', desc);
            send('/tryon', body, 'Uploading images and generating result...');
        });

        document.getElementById('demoButton').addEventListener('click', () => {
            const apiKey = document.getElementById('apiKey').value;
            if (!apiKey.trim()) return showError('Please enter your API key');
            const body = new FormData();
            body.append('apiKey', apiKey);
            send('/tryon/demo', body, 'Testing with demo images...');
        });

        document.getElementById('resetButton').addEventListener('click', () => {
            generation++;
            form.reset();
            document.querySelectorAll('.upload-area').forEach(area => area.clearSelection());
            showError('');
            results.style.display = 'none';
            setBusy(false);
        });

        document.getElementById('statusButton').addEventListener('click', async () => {
            const statusText = document.getElementById('statusText');
            const apiKey = document.getElementById('apiKey').value.trim();
            statusText.textContent = 'Checking...';
            try {
                const headers = apiKey ? { 'Authorization': 'Bearer ' + apiKey } : {};
                const status = await (await fetch('/status', { headers })).json();
                statusText.textContent = (status.isWorking ? '🟢 ' : '🔴 ') + status.status + (status.error ? ' (' + status.error + ')' : '');
            } catch (error) {
                statusText.textContent = '🔴 ' + error.message;
            }
        });
    </script>
</body>
</html>
        "#,
    )
}
